//! A dry-run engine that renders steps instead of running them.

use crate::core::cache::CacheMount;
use crate::core::container::Container;
use crate::core::directory::Directory;
use crate::core::error::{Error, Result};
use crate::core::image::ImageRef;
use crate::engine::{expand_vars, realize, EnvVars, Engine, ExecOutput};

/// Renders each primitive as a Dockerfile-like line.
///
/// Execs succeed with empty output. A file reads back empty when an exec
/// names it as its `-o` output and is otherwise missing. Variable
/// references the plan cannot resolve (base image variables) are kept as
/// `${NAME}` in the rendered value.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanEngine;

#[derive(Debug, Clone, Default)]
pub struct PlanState {
    env: EnvVars,
    steps: Vec<String>,
    outputs: Vec<String>,
}

impl PlanState {
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

impl PlanEngine {
    pub fn new() -> Self {
        PlanEngine
    }

    /// Render the steps needed to realize `container`.
    pub fn render(&self, container: &Container) -> Result<Vec<String>> {
        Ok(realize(self, container)?.state.steps)
    }
}

impl Engine for PlanEngine {
    type State = PlanState;

    fn from_image(&self, image: &ImageRef) -> Result<PlanState> {
        Ok(PlanState {
            env: EnvVars::new(),
            steps: vec![format!("FROM {}", image)],
            outputs: Vec::new(),
        })
    }

    fn with_env_variable(
        &self,
        mut state: PlanState,
        name: &str,
        value: &str,
        expand: bool,
    ) -> Result<PlanState> {
        let value = if expand {
            expand_vars(value, |n| {
                Some(
                    state
                        .env
                        .get(n)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("${{{}}}", n)),
                )
            })
        } else {
            value.to_string()
        };
        state.steps.push(format!("ENV {}={}", name, value));
        state.env.set(name, &value, false);
        Ok(state)
    }

    fn with_workdir(&self, mut state: PlanState, path: &str) -> Result<PlanState> {
        state.steps.push(format!("WORKDIR {}", path));
        Ok(state)
    }

    fn with_mounted_directory(
        &self,
        mut state: PlanState,
        path: &str,
        source: &Directory,
    ) -> Result<PlanState> {
        state.steps.push(format!(
            "MOUNT type=bind,source={},target={}",
            source.host_path().display(),
            path
        ));
        Ok(state)
    }

    fn with_mounted_cache(&self, mut state: PlanState, mount: &CacheMount) -> Result<PlanState> {
        let mut line = format!(
            "MOUNT type=cache,id={},target={},sharing={}",
            mount.volume.name(),
            mount.target,
            mount.sharing
        );
        if let Some(ref source) = mount.source {
            line.push_str(&format!(",from={}", source.host_path().display()));
        }
        state.steps.push(line);
        Ok(state)
    }

    fn with_exec(&self, mut state: PlanState, args: &[String]) -> Result<(PlanState, ExecOutput)> {
        // JSON array form keeps argument boundaries visible
        let rendered = serde_json::to_string(args).unwrap_or_else(|_| args.join(" "));
        state.steps.push(format!("RUN {}", rendered));
        if let Some(pos) = args.iter().position(|a| a == "-o") {
            if let Some(path) = args.get(pos + 1) {
                state.outputs.push(path.clone());
            }
        }
        Ok((state, ExecOutput::default()))
    }

    fn read_file(&self, state: &PlanState, path: &str) -> Result<Vec<u8>> {
        if state.outputs.iter().any(|o| o == path) {
            Ok(Vec::new())
        } else {
            Err(Error::ArtifactNotFound {
                path: path.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{CacheSharingMode, CacheVolume};

    #[test]
    fn test_render_steps() {
        let container = Container::from_image("golang:1.22")
            .with_mounted_cache(
                "/go/pkg/mod",
                CacheVolume::new("go-mod"),
                None,
                Some(CacheSharingMode::Locked),
            )
            .with_env_variable("GOOS", "linux", false)
            .with_workdir("/work/src")
            .with_mounted_directory("/work/src", Directory::host("/tmp/app"))
            .with_exec(["go", "build", "."]);

        let steps = PlanEngine::new().render(&container).unwrap();
        assert_eq!(
            steps,
            vec![
                "FROM golang:1.22",
                "MOUNT type=cache,id=go-mod,target=/go/pkg/mod,sharing=locked",
                "ENV GOOS=linux",
                "WORKDIR /work/src",
                "MOUNT type=bind,source=/tmp/app,target=/work/src",
                r#"RUN ["go","build","."]"#,
            ]
        );
    }

    #[test]
    fn test_render_keeps_unknown_references() {
        let container = Container::from_image("golang:latest")
            .with_env_variable("GOBIN", "/go/bin", false)
            .with_env_variable("PATH", "$GOBIN:$PATH", true);

        let steps = PlanEngine::new().render(&container).unwrap();
        assert_eq!(steps.last().unwrap(), "ENV PATH=/go/bin:${PATH}");
    }

    #[test]
    fn test_read_file_only_sees_exec_outputs() {
        let container = Container::from_image("golang:latest")
            .with_exec(["go", "build", "-o", "/work/out/binary", "."]);

        let engine = PlanEngine::new();
        assert!(container.file("/work/out/binary").contents(&engine).unwrap().is_empty());

        let err = container.file("/work/out/other").contents(&engine).unwrap_err();
        assert!(matches!(err, Error::ArtifactNotFound { ref path } if path == "/work/out/other"));
    }
}
