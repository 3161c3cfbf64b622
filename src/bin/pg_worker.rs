//! Runs one embedded `PostgreSQL` lifecycle step for the integration suite.
//!
//! Usage:
//!
//! ```text
//! pg_worker <setup | start | stop> <payload-path>
//! ```
//!
//! The payload is the JSON [`WorkerPayload`] written by the test cluster
//! bootstrap: `PostgreSQL` settings plus environment overrides. When started
//! as root the worker switches to `nobody` before touching the data
//! directory, since `initdb` refuses to run as root.

#[cfg(unix)]
use camino::{Utf8Path, Utf8PathBuf};
#[cfg(unix)]
use nix::unistd::{Uid, User, initgroups, setgid, setuid};
#[cfg(unix)]
use pg_embedded_setup_unpriv::ambient_dir_and_path;
#[cfg(unix)]
use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
#[cfg(unix)]
use postgresql_embedded::{PostgreSQL, Status};
#[cfg(unix)]
use std::env;
#[cfg(unix)]
use std::ffi::CString;
#[cfg(unix)]
use std::io::Read;
#[cfg(unix)]
use thiserror::Error;
#[cfg(unix)]
use tokio::runtime::Builder;

#[cfg(unix)]
const UNPRIVILEGED_USER: &str = "nobody";

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that stop the worker.
#[cfg(unix)]
#[derive(Debug, Error)]
enum WorkerError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("failed to read payload: {0}")]
    PayloadRead(#[source] BoxError),
    #[error("failed to parse payload: {0}")]
    PayloadParse(#[source] serde_json::Error),
    #[error("invalid settings in payload: {0}")]
    Settings(String),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("failed to drop privileges: {0}")]
    PrivilegeDrop(String),
    #[error("postgres {step} failed: {message}")]
    Postgres { step: &'static str, message: String },
}

#[cfg(unix)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Setup,
    Start,
    Stop,
}

#[cfg(unix)]
impl Step {
    fn parse(arg: &str) -> Result<Self, WorkerError> {
        match arg {
            "setup" => Ok(Self::Setup),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(WorkerError::InvalidArgs(format!(
                "unknown step '{other}'; expected setup, start, or stop"
            ))),
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

#[cfg(unix)]
fn main() -> Result<(), BoxError> {
    let args = env::args_os()
        .skip(1)
        .map(|arg| {
            arg.into_string()
                .map_err(|_| WorkerError::InvalidArgs("argument is not valid UTF-8".into()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (step, payload_path) = parse_args(&args)?;
    run(step, &payload_path).map_err(Into::into)
}

#[cfg(unix)]
fn parse_args(args: &[String]) -> Result<(Step, Utf8PathBuf), WorkerError> {
    match args {
        [step, path] => Ok((Step::parse(step)?, Utf8PathBuf::from(path))),
        _ => Err(WorkerError::InvalidArgs(format!(
            "expected <step> <payload-path>, got {} arguments",
            args.len()
        ))),
    }
}

#[cfg(unix)]
fn run(step: Step, payload_path: &Utf8Path) -> Result<(), WorkerError> {
    let payload = load_payload(payload_path)?;
    drop_privileges_if_root()?;
    let settings = payload
        .settings
        .into_settings()
        .map_err(|err| WorkerError::Settings(err.to_string()))?;
    apply_environment(&payload.environment);

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(WorkerError::RuntimeInit)?;
    let mut postgres = PostgreSQL::new(settings);
    runtime.block_on(async {
        match step {
            Step::Setup => {
                postgres.setup().await.map_err(|err| failed(step, &err))?;
                ensure_started(&mut postgres, step).await
            }
            Step::Start => ensure_started(&mut postgres, step).await,
            Step::Stop => postgres.stop().await.map_err(|err| failed(step, &err)),
        }
    })?;

    if step != Step::Stop {
        // Dropping the handle stops the server; it must outlive the worker.
        std::mem::forget(postgres);
    }
    Ok(())
}

#[cfg(unix)]
async fn ensure_started(postgres: &mut PostgreSQL, step: Step) -> Result<(), WorkerError> {
    if matches!(postgres.status(), Status::Started) {
        return Ok(());
    }
    postgres.start().await.map_err(|err| failed(step, &err))
}

#[cfg(unix)]
fn failed(step: Step, err: &impl std::fmt::Display) -> WorkerError {
    WorkerError::Postgres {
        step: step.as_str(),
        message: err.to_string(),
    }
}

#[cfg(unix)]
fn load_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerError> {
    let bytes = read_file(path).map_err(WorkerError::PayloadRead)?;
    serde_json::from_slice(&bytes).map_err(WorkerError::PayloadParse)
}

#[cfg(unix)]
fn read_file(path: &Utf8Path) -> Result<Vec<u8>, BoxError> {
    let (dir, relative) = ambient_dir_and_path(path)?;
    let mut file = dir.open(relative.as_std_path())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(unix)]
fn drop_privileges_if_root() -> Result<(), WorkerError> {
    if !Uid::effective().is_root() {
        return Ok(());
    }

    let user = User::from_name(UNPRIVILEGED_USER)
        .map_err(|err| WorkerError::PrivilegeDrop(err.to_string()))?
        .ok_or_else(|| {
            WorkerError::PrivilegeDrop(format!("user '{UNPRIVILEGED_USER}' not found"))
        })?;
    let name = CString::new(user.name.clone())
        .map_err(|err| WorkerError::PrivilegeDrop(err.to_string()))?;
    initgroups(&name, user.gid).map_err(|err| WorkerError::PrivilegeDrop(err.to_string()))?;
    setgid(user.gid).map_err(|err| WorkerError::PrivilegeDrop(err.to_string()))?;
    setuid(user.uid).map_err(|err| WorkerError::PrivilegeDrop(err.to_string()))?;

    // SAFETY: no other thread exists yet; the runtime is built afterwards.
    unsafe {
        env::set_var("HOME", &user.dir);
        env::set_var("USER", &user.name);
        env::set_var("LOGNAME", &user.name);
    }
    Ok(())
}

#[cfg(unix)]
fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
    for (key, value) in environment {
        // SAFETY: no other thread exists yet; the runtime is built afterwards.
        unsafe {
            match value {
                Some(plain) => env::set_var(key, plain.expose()),
                None => env::remove_var(key),
            }
        }
    }
}

#[cfg(not(unix))]
fn main() -> Result<(), BoxError> {
    Err("pg_worker is only supported on Unix platforms".into())
}
