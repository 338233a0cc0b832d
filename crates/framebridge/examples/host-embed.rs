//! One host and one embedded frame in the same process.
//!
//! Run with:
//!   cargo run --example host-embed --features peer
//!
//! The embed reports its height, grows, and answers a `TOGGLE_THEME`
//! request from the host.

use std::sync::Arc;
use std::time::Duration;

use framebridge::peer::{handler_fn, ContentRoot, EmbedBridge, EmbedConfig, HostBridge, HostConfig};
use framebridge::transport::Window;
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host_window = Window::open("https://app.example/dashboard")?;
    let embed_window = Window::open("https://widgets.example/chart")?;

    let host = HostBridge::mount(
        &host_window,
        Arc::new(embed_window.endpoint(&host_window)),
        HostConfig::new("https://widgets.example/chart").with_channel_prefix("chart"),
    )?;
    eprintln!("Mounted {} as {}", host.frame_url(), host.channel_id());

    // The embed learns its channel from the host's init message.
    let embed = EmbedBridge::attach(
        &embed_window,
        Arc::new(host_window.endpoint(&embed_window)),
        EmbedConfig::default().with_target_origin("https://app.example"),
    )?;
    embed.register_action_handler(
        "TOGGLE_THEME",
        handler_fn(|payload: Option<Value>| {
            let dark = payload
                .as_ref()
                .and_then(|p| p.get("dark"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok::<_, String>(json!({ "theme": if dark { "dark" } else { "light" } }))
        }),
    );

    let root = ContentRoot::new(300);
    embed.attach_content_root(root.clone());
    host.frame_loaded()?;

    let mut heights = host.watch_height();
    heights.wait_for(|height| *height == 300).await?;
    eprintln!("Frame height {} (loading: {})", host.content_height(), host.is_loading());

    root.set_scroll_height(620);
    heights.wait_for(|height| *height == 620).await?;
    eprintln!("Frame height {}", host.content_height());

    let theme = host
        .send_request_with_timeout("TOGGLE_THEME", Some(json!({ "dark": true })), Duration::from_secs(1))
        .await?;
    eprintln!("Embed answered {theme}");

    embed.shutdown();
    host.unmount();
    Ok(())
}
