//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! One request per line, answered in order. Blank lines are skipped and
//! notifications get no reply.

use crate::server::McpServer;
use crate::types::{McpError, McpRequest, McpResponse, RequestId};
use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Serve the process's stdin/stdout until stdin closes.
pub async fn serve(server: &McpServer) -> io::Result<()> {
    info!(server = %server.info().name, "Serving MCP over stdio");
    serve_io(server, io::stdin(), io::stdout()).await
}

/// Serve any reader/writer pair until the reader reaches end of input.
pub async fn serve_io<R, W>(server: &McpServer, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut writer = io::BufWriter::new(writer);

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: McpRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Unparsable request line");
                let response = McpResponse::error(RequestId::Null, McpError::parse_error(err));
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        if let Some(response) = server.handle_request(request).await {
            write_response(&mut writer, &response).await?;
        }
    }

    debug!("Input closed");
    Ok(())
}

async fn write_response<W>(writer: &mut io::BufWriter<W>, response: &McpResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = serde_json::to_string(response)?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
