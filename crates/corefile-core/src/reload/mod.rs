//! Reload driver
//!
//! Two interchangeable [`Reloader`] backends, picked once from
//! [`ReloadConfig`] when the manager is built:
//!
//! - [`DockerReloader`]: CoreDNS in a named container, signalled through the Docker CLI
//! - [`ProcessReloader`]: CoreDNS as a host process, signalled directly
//!
//! Both deliver `SIGUSR1`, which makes CoreDNS re-read its Corefile
//! without dropping its listeners.

mod command;
pub mod docker;
pub mod process;
pub mod validate;

use std::time::Duration;

use crate::config::ReloadConfig;
use crate::traits::Reloader;

pub use docker::DockerReloader;
pub use process::ProcessReloader;
pub use validate::check_corefile;

/// Signal name passed to the container runtime
pub const RELOAD_SIGNAL: &str = "SIGUSR1";

/// Build the configured reload backend
pub fn from_config(config: &ReloadConfig, timeout: Duration) -> Box<dyn Reloader> {
    match config {
        ReloadConfig::Docker {
            container_name,
            docker_bin,
        } => Box::new(DockerReloader::new(
            container_name.clone(),
            docker_bin.clone(),
            timeout,
        )),
        ReloadConfig::Process { pattern } => {
            Box::new(ProcessReloader::new(pattern.clone(), timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ReloadMethod;

    #[test]
    fn builds_backend_from_config() {
        let docker = from_config(&ReloadConfig::default(), Duration::from_secs(5));
        assert_eq!(docker.method(), ReloadMethod::Docker);
        assert_eq!(docker.target(), "coredns");

        let process = from_config(
            &ReloadConfig::Process {
                pattern: "coredns -conf".to_string(),
            },
            Duration::from_secs(5),
        );
        assert_eq!(process.method(), ReloadMethod::Process);
        assert_eq!(process.target(), "coredns -conf");
    }
}
