use async_trait::async_trait;
use bollard::container::{Config as ContainerConfig, CreateContainerOptions, RemoveContainerOptions};
use bollard::errors::Error as DockerError;
use bollard::Docker;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{timeout_secs, CreateRequest, SandboxBackend, SandboxError, SandboxHandle};

const LABEL_MANAGED: &str = "sandbox-agent.managed";
const LABEL_TEMPLATE: &str = "sandbox-agent.template";
const WORKDIR: &str = "/workspace";

/// Runs sandboxes as local Docker containers.
///
/// The template names the image. The container's main process sleeps for
/// the idle timeout, so an abandoned sandbox stops on its own.
#[derive(Debug, Default)]
pub struct DockerBackend;

impl DockerBackend {
    pub fn new() -> Self {
        Self
    }

    async fn connect() -> Result<Docker, SandboxError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| SandboxError::docker_unavailable(e.to_string()))?;

        // Check if Docker is accessible
        docker
            .ping()
            .await
            .map_err(|e| SandboxError::docker_unavailable(format!("cannot ping daemon: {e}")))?;

        Ok(docker)
    }
}

#[async_trait]
impl SandboxBackend for DockerBackend {
    fn name(&self) -> &'static str {
        "Docker"
    }

    async fn create(&self, request: &CreateRequest<'_>) -> Result<SandboxHandle, SandboxError> {
        let docker = Self::connect().await?;
        let container_name = container_name();

        debug!("Creating container {} from {}", container_name, request.template);
        docker
            .create_container(
                Some(CreateContainerOptions {
                    name: container_name.clone(),
                    platform: None,
                }),
                container_config(request.template, request.timeout),
            )
            .await
            .map_err(|e| create_error(e, request.template))?;

        debug!("Starting container");
        if let Err(e) = docker
            .start_container::<String>(&container_name, None)
            .await
        {
            // Don't leave a created-but-stopped container behind
            let _ = docker
                .remove_container(
                    &container_name,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
            return Err(SandboxError::container_failed(format!(
                "failed to start {container_name}: {e}"
            )));
        }

        info!("Docker sandbox started: {}", container_name);
        Ok(SandboxHandle::new(container_name, request.template, None))
    }

    async fn close(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        let docker = Self::connect().await?;

        debug!("Removing container {}", handle.id());
        match docker
            .remove_container(
                handle.id(),
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(()) => {
                info!("Docker sandbox removed: {}", handle.id());
                Ok(())
            }
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(SandboxError::not_found(handle.id())),
            Err(e) => {
                warn!("Failed to remove container {}: {}", handle.id(), e);
                Err(SandboxError::container_failed(e.to_string()))
            }
        }
    }
}

fn container_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("sandbox-agent-{}", &id[..8])
}

fn container_config(image: &str, timeout: Duration) -> ContainerConfig<String> {
    let labels = HashMap::from([
        (LABEL_MANAGED.to_string(), "true".to_string()),
        (LABEL_TEMPLATE.to_string(), image.to_string()),
    ]);

    ContainerConfig {
        image: Some(image.to_string()),
        cmd: Some(idle_command(timeout)),
        working_dir: Some(WORKDIR.to_string()),
        labels: Some(labels),
        ..Default::default()
    }
}

/// Main process of the container: stay alive for the idle timeout.
fn idle_command(timeout: Duration) -> Vec<String> {
    let secs = timeout_secs(timeout);
    let duration = if secs == 0 {
        "infinity".to_string()
    } else {
        secs.to_string()
    };
    vec!["sleep".to_string(), duration]
}

fn create_error(error: DockerError, image: &str) -> SandboxError {
    match error {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => SandboxError::template_not_found(format!("{image} (run `docker pull {image}`)")),
        other => SandboxError::container_failed(format!("failed to create container: {other}")),
    }
}
