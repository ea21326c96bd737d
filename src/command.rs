//! Construction of the external probe invocation.

/// Operating system family, as far as `ping` flags are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Argument vector (program first) for a system `ping` sending `count` echoes.
pub fn build_probe_command(host: &str, count: u32, platform: Platform) -> Vec<String> {
    let count_flag = match platform {
        Platform::Windows => "-n",
        Platform::Unix => "-c",
    };
    vec![
        "ping".to_string(),
        count_flag.to_string(),
        count.to_string(),
        host.to_string(),
    ]
}

/// Policy deciding which process a probe runs.
pub trait ProbeCommand: Send + Sync {
    fn build(&self, host: &str, count: u32) -> Vec<String>;
}

/// The platform's own `ping` binary.
#[derive(Debug, Clone, Copy)]
pub struct SystemPing {
    pub platform: Platform,
}

impl Default for SystemPing {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
        }
    }
}

impl ProbeCommand for SystemPing {
    fn build(&self, host: &str, count: u32) -> Vec<String> {
        build_probe_command(host, count, self.platform)
    }
}
