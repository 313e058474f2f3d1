use color_eyre::eyre::{eyre, Result};
use std::process::{Command, Stdio};

/// Launch the platform's URL opener for a run's web page. Only http(s) links
/// are accepted.
pub fn open_in_browser(url: &str) -> Result<()> {
    check_openable(url)?;

    if cfg!(target_os = "windows") {
        // The empty title argument stops `start` from treating the URL as one.
        return spawn_detached("cmd", &["/C", "start", "", url])
            .map_err(|e| eyre!("Failed to open browser: {e}"));
    }

    let wsl = std::env::var_os("WSL_DISTRO_NAME").is_some();
    let openers: &[&str] = if cfg!(target_os = "macos") {
        &["open"]
    } else if wsl {
        &["wslview", "xdg-open"]
    } else {
        &["xdg-open"]
    };

    for opener in openers {
        match spawn_detached(opener, &[url]) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(eyre!("Failed to open browser with {opener}: {e}")),
        }
    }

    if wsl {
        return spawn_detached("cmd.exe", &["/C", "start", "", url])
            .map_err(|e| eyre!("Failed to open browser via cmd.exe: {e}"));
    }

    Err(eyre!(
        "No browser opener found (tried {}); link: {url}",
        openers.join(", ")
    ))
}

fn check_openable(url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(eyre!("Refusing to open non-HTTP URL: {url}"))
    }
}

fn spawn_detached(program: &str, args: &[&str]) -> std::io::Result<()> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_schemes() {
        assert!(check_openable("file:///etc/passwd").is_err());
        assert!(check_openable("javascript:alert(1)").is_err());
        assert!(open_in_browser("ftp://example.test").is_err());
    }

    #[test]
    fn accepts_azure_links() {
        assert!(check_openable("https://dev.azure.com/acme/web/_build/results?buildId=7").is_ok());
        assert!(check_openable("http://tfs.local/tfs/acme").is_ok());
    }
}
