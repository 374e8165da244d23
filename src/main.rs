#[cfg(windows)]
fn main() {
    use tracing_subscriber::EnvFilter;
    use windows::Win32::UI::WindowsAndMessaging::{MB_ICONERROR, MB_OK, MessageBoxW};
    use windows::core::{HSTRING, w};

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match glasspane::app::Application::new() {
        Ok(application) => std::process::exit(application.run()),
        Err(error) => {
            tracing::error!(%error, "setup failed");
            let text = HSTRING::from(error.to_string());
            unsafe {
                MessageBoxW(None, &text, w!("Fatal error!"), MB_OK | MB_ICONERROR);
            }
            std::process::exit(1);
        }
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("glasspane drives the Windows compositor; there is nothing to run here");
    std::process::exit(1);
}
