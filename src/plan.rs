use std::fmt;
use std::path::{Path, PathBuf};

use crate::credentials::GkeCredentials;
use crate::error::{Error, Result};
use crate::params::Params;

/// Programs and paths the plan refers to.
#[derive(Clone, Debug)]
pub struct Tools {
    pub gcloud: PathBuf,
    pub kubectl: PathBuf,
    pub key_file: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            gcloud: PathBuf::from("gcloud"),
            kubectl: PathBuf::from("kubectl"),
            key_file: PathBuf::from(crate::key_file::DEFAULT_KEY_FILE_PATH),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlannedCommand {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PlannedCommand {
    fn new(label: impl Into<String>, program: &Path, args: Vec<String>) -> Self {
        Self {
            label: label.into(),
            program: program.to_path_buf(),
            args,
        }
    }
}

impl fmt::Display for PlannedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Commands to run in order. The last one is the long-running port-forward.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandPlan {
    pub steps: Vec<PlannedCommand>,
}

impl CommandPlan {
    pub fn setup_steps(&self) -> &[PlannedCommand] {
        match self.steps.split_last() {
            Some((_, setup)) => setup,
            None => &[],
        }
    }

    pub fn forward_step(&self) -> Option<&PlannedCommand> {
        self.steps.last()
    }

    /// Points every step that runs `from` at `to`.
    pub fn replace_program(&mut self, from: &Path, to: &Path) {
        for step in self.steps.iter_mut().filter(|step| step.program == from) {
            step.program = to.to_path_buf();
        }
    }
}

pub fn build_plan(
    params: &Params,
    credential: &GkeCredentials,
    service_account_email: &str,
    tools: &Tools,
) -> Result<CommandPlan> {
    let props = &credential.additional_properties;

    let mut steps = vec![
        PlannedCommand::new(
            "Authenticating to google cloud",
            &tools.gcloud,
            vec![
                "auth".to_string(),
                "activate-service-account".to_string(),
                service_account_email.to_string(),
                "--key-file".to_string(),
                tools.key_file.display().to_string(),
            ],
        ),
        PlannedCommand::new(
            format!("Setting gcloud account to {service_account_email}"),
            &tools.gcloud,
            vec![
                "config".to_string(),
                "set".to_string(),
                "account".to_string(),
                service_account_email.to_string(),
            ],
        ),
        PlannedCommand::new(
            "Setting gcloud project",
            &tools.gcloud,
            vec![
                "config".to_string(),
                "set".to_string(),
                "project".to_string(),
                props.project.clone(),
            ],
        ),
    ];

    let mut get_credentials_args = vec![
        "container".to_string(),
        "clusters".to_string(),
        "get-credentials".to_string(),
        props.cluster.clone(),
    ];
    if !props.zone.is_empty() {
        get_credentials_args.push("--zone".to_string());
        get_credentials_args.push(props.zone.clone());
    } else if !props.region.is_empty() {
        get_credentials_args.push("--region".to_string());
        get_credentials_args.push(props.region.clone());
    } else {
        return Err(Error::NoLocationSpecified {
            credential: credential.name.clone(),
        });
    }
    steps.push(PlannedCommand::new(
        format!("Getting gke credentials for cluster {}", props.cluster),
        &tools.gcloud,
        get_credentials_args,
    ));

    steps.push(PlannedCommand::new(
        format!(
            "Forwarding port {} to port {} on service {} in namespace {}",
            params.local_port, params.service_port, params.service, params.namespace
        ),
        &tools.kubectl,
        vec![
            "port-forward".to_string(),
            format!("service/{}", params.service),
            format!("{}:{}", params.local_port, params.service_port),
            "--address=0.0.0.0".to_string(),
            "-n".to_string(),
            params.namespace.clone(),
        ],
    ));

    Ok(CommandPlan { steps })
}
