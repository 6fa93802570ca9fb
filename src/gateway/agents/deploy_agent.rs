//! `deploy` agent (§4.3). The only agent carrying mutable state across
//! requests: a `dev → staging → prod` deployment ledger guarded by a
//! single mutex, matching the promotion rules in §8.

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::error::Error;
use std::fmt::Write as _;
use std::sync::OnceLock;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Some(Self::Dev),
            "staging" | "stage" => Some(Self::Staging),
            "prod" | "production" => Some(Self::Prod),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }

    /// The environment immediately before this one in the promotion chain.
    fn predecessor(&self) -> Option<Self> {
        match self {
            Self::Dev => None,
            Self::Staging => Some(Self::Dev),
            Self::Prod => Some(Self::Staging),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentRecord {
    pub version: String,
    pub deployed_at: DateTime<Utc>,
    pub status: &'static str,
}

/// `dev → staging → prod`, in promotion order, each slot independently
/// mutable. Starts with a baseline version in every slot so the first
/// promotion has something to read from.
pub struct DeploymentState {
    dev: DeploymentRecord,
    staging: DeploymentRecord,
    prod: DeploymentRecord,
}

impl DeploymentState {
    fn baseline(now: DateTime<Utc>) -> Self {
        let record = |v: &str| DeploymentRecord {
            version: v.to_string(),
            deployed_at: now,
            status: "deployed",
        };
        Self {
            dev: record("1.0.0"),
            staging: record("1.0.0"),
            prod: record("1.0.0"),
        }
    }

    fn get(&self, env: Environment) -> &DeploymentRecord {
        match env {
            Environment::Dev => &self.dev,
            Environment::Staging => &self.staging,
            Environment::Prod => &self.prod,
        }
    }

    fn set(&mut self, env: Environment, record: DeploymentRecord) {
        match env {
            Environment::Dev => self.dev = record,
            Environment::Staging => self.staging = record,
            Environment::Prod => self.prod = record,
        }
    }
}

enum Command {
    Status,
    Promote { from: Environment, to: Environment },
    Deploy { to: Environment },
    Rollback { env: Environment },
}

fn promote_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)promote\s+(dev(?:elopment)?|staging|stage|prod(?:uction)?)\s+to\s+(dev(?:elopment)?|staging|stage|prod(?:uction)?)").unwrap())
}

fn deploy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)deploy\s+to\s+(dev(?:elopment)?|staging|stage|prod(?:uction)?)").unwrap())
}

fn rollback_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)rollback\s+(dev(?:elopment)?|staging|stage|prod(?:uction)?)").unwrap())
}

fn parse_command(message: &str) -> Command {
    if let Some(caps) = promote_pattern().captures(message) {
        if let (Some(from), Some(to)) = (Environment::parse(&caps[1]), Environment::parse(&caps[2])) {
            return Command::Promote { from, to };
        }
    }
    if let Some(caps) = rollback_pattern().captures(message) {
        if let Some(env) = Environment::parse(&caps[1]) {
            return Command::Rollback { env };
        }
    }
    if let Some(caps) = deploy_pattern().captures(message) {
        if let Some(env) = Environment::parse(&caps[1]) {
            return Command::Deploy { to: env };
        }
    }
    Command::Status
}

pub struct DeployAgent {
    capabilities: Capabilities,
    state: Mutex<DeploymentState>,
}

impl DeployAgent {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            capabilities: Capabilities {
                id: "deploy",
                name: "Deploy",
                description: "Tracks and promotes deployment state across dev, staging, and prod.",
                version: "1.0.0",
                supported_formats: &[],
                needs_iac_input: false,
            },
            state: Mutex::new(DeploymentState::baseline(now)),
        }
    }

    fn render_status(state: &DeploymentState) -> String {
        let mut out = String::from("| Environment | Version | Deployed At | Status |\n|---|---|---|---|\n");
        for env in [Environment::Dev, Environment::Staging, Environment::Prod] {
            let record = state.get(env);
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                env.as_str(),
                record.version,
                record.deployed_at.to_rfc3339(),
                record.status
            );
        }
        out
    }
}

#[async_trait]
impl Agent for DeployAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Deploy")).await;

        let message = request.last_user_message().unwrap_or("");
        let command = parse_command(message);

        let mut state = self.state.lock().await;

        let promotion = match command {
            Command::Promote { from, to } => Some((from, to)),
            Command::Deploy { to } => to.predecessor().map(|from| (from, to)),
            _ => None,
        };

        match command {
            Command::Status => {
                emitter.message(&Self::render_status(&state)).await;
            }
            Command::Deploy { to } if to.predecessor().is_none() => {
                emitter
                    .message("`dev` has no predecessor; nothing to deploy from.\n")
                    .await;
            }
            Command::Promote { .. } | Command::Deploy { .. } => {
                let (from, to) = promotion.expect("promotion is Some for Promote/Deploy commands");

                if to == Environment::Prod && from != Environment::Prod {
                    if to.predecessor() != Some(from) {
                        emitter
                            .message(&format!(
                                "Promotion rejected: `{}` cannot be promoted directly to `prod`; it must pass through `staging` first.\n",
                                from.as_str()
                            ))
                            .await;
                        return Ok(());
                    }
                    let source_version = state.get(from).version.clone();
                    emitter
                        .confirmation(
                            "Production promotion requires approval",
                            &format!(
                                "Promoting `{}` ({}) to `prod` requires manual approval and was not applied automatically.",
                                from.as_str(),
                                source_version
                            ),
                        )
                        .await;
                    emitter
                        .message(&format!(
                            "Promotion of `{}` to `prod` is staged but requires manual approval; `prod` was not modified.\n",
                            from.as_str()
                        ))
                        .await;
                    return Ok(());
                }

                if to.predecessor() != Some(from) {
                    emitter
                        .message(&format!(
                            "Promotion rejected: `{}` cannot be promoted directly to `{}`.\n",
                            from.as_str(),
                            to.as_str()
                        ))
                        .await;
                    return Ok(());
                }

                let source = state.get(from).clone_record();
                state.set(
                    to,
                    DeploymentRecord {
                        version: source.version.clone(),
                        deployed_at: Utc::now(),
                        status: "deployed",
                    },
                );
                emitter
                    .message(&format!(
                        "Promoted `{}` ({}) to `{}`.\n\n",
                        from.as_str(),
                        source.version,
                        to.as_str()
                    ))
                    .await;
                emitter.message(&Self::render_status(&state)).await;
            }
            Command::Rollback { env } => {
                let predecessor = env.predecessor();
                match predecessor {
                    None => {
                        emitter
                            .message("`dev` has no predecessor to roll back to.\n")
                            .await;
                    }
                    Some(source_env) => {
                        let source_version = state.get(source_env).version.clone();
                        state.set(
                            env,
                            DeploymentRecord {
                                version: source_version.clone(),
                                deployed_at: Utc::now(),
                                status: "rolled_back",
                            },
                        );
                        emitter
                            .message(&format!(
                                "Rolled back `{}` to version `{}` (matching `{}`).\n\n",
                                env.as_str(),
                                source_version,
                                source_env.as_str()
                            ))
                            .await;
                        emitter.message(&Self::render_status(&state)).await;
                    }
                }
            }
        }

        Ok(())
    }
}

impl DeploymentRecord {
    fn clone_record(&self) -> Self {
        self.clone()
    }
}
