mod pull_request;

pub use pull_request::{PullRequestJob, process_pull_request_job, report_commit_status};
