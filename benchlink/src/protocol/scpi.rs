//! Run a single `ScpiRequest` against an open channel.
use crate::transport::Channel;
use crate::{ScpiRequest, ScpiResponse};

pub async fn handle<C: Channel>(channel: &mut C, req: ScpiRequest) -> crate::Result<ScpiResponse> {
    match req {
        ScpiRequest::Write(x) => {
            channel.write_line(&x).await?;
            Ok(ScpiResponse::Done)
        }
        ScpiRequest::QueryString(x) => {
            let reply = channel.query_line(&x).await?;
            Ok(ScpiResponse::String(reply))
        }
    }
}
