//! Two frames sharing one host document, kept apart by channel id.
//!
//! Run with:
//!   cargo run --example multi-frame --features peer
//!
//! Both embeds post to the same host window; each host bridge only sees
//! the resize messages stamped with its own channel.

use std::sync::Arc;

use framebridge::message::{generate_channel_id, with_channel_param};
use framebridge::peer::{ContentRoot, EmbedBridge, EmbedConfig, HostBridge, HostConfig};
use framebridge::transport::{Url, Window};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host_window = Window::open("https://app.example/")?;

    let mut frames = Vec::new();
    for (name, height) in [("orders", 240u32), ("inventory", 480u32)] {
        let channel_id = generate_channel_id(name);
        let url = format!("https://widgets.example/{name}");
        let frame_url = with_channel_param(&Url::parse(&url)?, &channel_id);
        let embed_window = Window::open(frame_url.as_str())?;

        let host = HostBridge::mount(
            &host_window,
            Arc::new(embed_window.endpoint(&host_window)),
            HostConfig::new(url.as_str()).with_channel_id(channel_id.as_str()),
        )?;

        let embed = EmbedBridge::attach(
            &embed_window,
            Arc::new(host_window.endpoint(&embed_window)),
            EmbedConfig::from_location(embed_window.location())
                .with_target_origin(host_window.origin().serialize()),
        )?;
        embed.attach_content_root(ContentRoot::new(height));
        frames.push((name, height, host, embed));
    }

    for (name, height, host, _) in &frames {
        let mut heights = host.watch_height();
        heights.wait_for(|current| current == height).await?;
        eprintln!("{name}: channel {} height {}", host.channel_id(), host.content_height());
    }

    for (_, _, host, embed) in &frames {
        embed.shutdown();
        host.unmount();
    }
    Ok(())
}
