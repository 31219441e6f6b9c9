use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScpiRequest {
    Write(String),
    QueryString(String),
}

impl ScpiRequest {
    /// Classify a raw command line. Commands whose header ends in `?` expect a reply.
    pub fn from_command<T: Into<String>>(cmd: T) -> Self {
        let cmd = cmd.into();
        let header = cmd.split_whitespace().next().unwrap_or("");
        if header.ends_with('?') {
            ScpiRequest::QueryString(cmd)
        } else {
            ScpiRequest::Write(cmd)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScpiResponse {
    Done,
    String(String),
}
