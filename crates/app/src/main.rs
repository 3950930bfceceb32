use banter::app::{ChatShell, Quit};
use banter::chat::ChatView;
use banter::settings::SettingsStore;
use gpui::*;
use gpui_component::Root;

/// Application entry point.
///
/// Bootstraps the GPUI application with:
/// 1. Asset loading via gpui-component-assets
/// 2. gpui-component initialization (required for Root and themes)
/// 3. One chat transport handle, built from settings, for the process
///    lifetime
/// 4. Window creation with Root wrapper for gpui-component composition
fn main() {
    // Initialize tracing for development debugging
    tracing_subscriber::fmt::init();

    // Create application with bundled assets
    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(|cx| {
        gpui_tokio_bridge::init(cx);

        // Initialize gpui-component - REQUIRED before any Root usage
        gpui_component::init(cx);

        let settings = SettingsStore::load().settings();
        let display_name = settings.display_name.clone();

        // The transport is built exactly once; subscription and mutation
        // traffic share it until the process exits.
        let transport = match banter_client::create_transport(settings.to_transport_config()) {
            Ok(transport) => transport,
            Err(error) => {
                tracing::error!("failed to initialize chat transport: {error}");
                cx.quit();
                return;
            }
        };

        // Quit action: cleanly shut down the application
        cx.on_action(|_: &Quit, cx| {
            cx.quit();
        });

        cx.bind_keys([KeyBinding::new("cmd-q", Quit, None)]);

        // Spawn async window creation to ensure all initialization is complete
        cx.spawn(async move |cx| {
            cx.update(|cx| {
                // Window options with reasonable defaults for a chat app
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(900.), px(700.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        appears_transparent: true,
                        // Align traffic lights with Zed-style top titlebar inset.
                        traffic_light_position: Some(point(px(9.), px(9.))),
                        ..Default::default()
                    }),
                    // Match Zed-style client decorations on Linux/FreeBSD so the app draws
                    // its own title area instead of showing a system titlebar.
                    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
                    window_decorations: Some(WindowDecorations::Client),
                    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
                    window_decorations: None,
                    ..Default::default()
                };

                // Open the main window with Root wrapper
                // Root is REQUIRED by gpui-component for notifications/dialogs/sheets
                cx.open_window(options, |window, cx| {
                    let chat_view = cx.new(|cx| {
                        ChatView::new(transport.clone(), &display_name, window, cx)
                    });
                    let shell = cx.new(|cx| ChatShell::new(chat_view, window, cx));

                    cx.new(|cx| Root::new(shell, window, cx))
                })
                .expect("failed to open main window");

                // Activate the application
                cx.activate(true);
            })
        })
        .detach();
    });
}
