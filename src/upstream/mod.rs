//! Clients for the external capabilities the tools wrap.
//!
//! Each upstream sits behind a trait so tool sets can be exercised against
//! stubs that count calls:
//!
//! - **process** / **git**: subprocess execution and the closed set of git invocations
//! - **brave**: web search and page fetching
//! - **github**: GitHub REST API
//! - **mail**: SMTP submission
//! - **stats**: CPU and memory counters
//! - **fs**: allow-list resolution and filesystem helpers
//! - **web**: arbitrary HTTP requests

pub mod brave;
pub mod fs;
pub mod git;
pub mod github;
pub mod http;
pub mod mail;
pub mod process;
pub mod stats;
pub mod web;

#[cfg(test)]
mod git_test;
#[cfg(test)]
mod mail_test;
#[cfg(test)]
mod process_test;

pub use brave::{BraveClient, FetchedPage, SearchBackend, SearchHit};
pub use fs::AllowList;
pub use git::{Git, GitCommand, GitError, GitRun};
pub use github::{GitHubApi, GitHubClient};
pub use http::HttpError;
#[cfg(test)]
pub use mail::MockMailer;
pub use mail::{MailError, Mailer, OutgoingMail, SmtpMailer, SmtpSettings};
pub use process::{CommandOutput, CommandRunner, Invocation, ProcessError, TokioRunner};
#[cfg(test)]
pub use stats::MockStatsSource;
pub use stats::{CpuCounts, MemorySnapshot, StatsSource, SysinfoStats};
pub use web::{ApiRequest, ApiResponse, HttpApi, ReqwestApi, RequestBody};
