//! The protocol loop: initialize handshake, then one message at a time.

use lsp_server::{Connection, ErrorCode, Message, Notification, Request, RequestId, Response};
use lsp_types::notification::Notification as _;
use lsp_types::request::Request as _;
use lsp_types::{
    notification, request, CodeActionProviderCapability, CodeLensOptions, ExecuteCommandOptions,
    HoverProviderCapability, InitializeParams, MessageType, OneOf, PublishDiagnosticsParams,
    SaveOptions, ServerCapabilities, ShowMessageRequestParams, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions,
    WorkDoneProgressOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::commands::ServerCommand;
use crate::error::{CommandError, ServerError};
use crate::logging::init_logging;
use crate::server::{DocumentEvents, QueryMethods, Server, WorkspaceEvents};

pub fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
            open_close: Some(true),
            change: Some(TextDocumentSyncKind::INCREMENTAL),
            will_save: None,
            will_save_wait_until: None,
            save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                include_text: Some(false),
            })),
        })),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        document_symbol_provider: Some(OneOf::Left(true)),
        code_lens_provider: Some(CodeLensOptions {
            resolve_provider: Some(false),
        }),
        code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
        execute_command_provider: Some(ExecuteCommandOptions {
            commands: ServerCommand::ALL
                .iter()
                .map(|command| command.name().to_string())
                .collect(),
            work_done_progress_options: WorkDoneProgressOptions::default(),
        }),
        ..Default::default()
    }
}

/// Serve stdin/stdout until the client shuts the session down.
///
/// Installs the stderr log subscriber first, filtered by `RUST_LOG` or the
/// configured `[logging].filter`.
pub fn run_stdio(mut server: Server) -> Result<(), ServerError> {
    if !init_logging(&server.config().logging.filter) {
        debug!("log subscriber already installed");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "serving on stdio");
    let (connection, io_threads) = Connection::stdio();
    serve(&connection, &mut server)?;
    drop(connection);
    io_threads.join()?;
    Ok(())
}

/// Perform the initialize handshake, then run the message loop.
pub fn serve(connection: &Connection, server: &mut Server) -> Result<(), ServerError> {
    let capabilities = serde_json::to_value(server_capabilities())?;
    let params = connection.initialize(capabilities)?;
    let params: InitializeParams = serde_json::from_value(params)?;
    server.initialize(&params);
    main_loop(connection, server)
}

fn main_loop(connection: &Connection, server: &mut Server) -> Result<(), ServerError> {
    let mut outgoing = OutgoingRequests::default();

    for msg in &connection.receiver {
        match msg {
            Message::Notification(not) => {
                for params in handle_notification(server, &not) {
                    publish_diagnostics(connection, params)?;
                }
            }
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    info!("shutdown requested");
                    return Ok(());
                }
                handle_request(connection, server, &req, &mut outgoing)?;
            }
            Message::Response(resp) => {
                debug!(id = ?resp.id, "ignoring client response");
            }
        }
    }
    Ok(())
}

/// Ids for server-to-client requests.
#[derive(Debug, Default)]
struct OutgoingRequests {
    next: u64,
}

impl OutgoingRequests {
    fn next_id(&mut self) -> RequestId {
        self.next += 1;
        RequestId::from(format!("ariadne-{}", self.next))
    }
}

fn send(connection: &Connection, message: Message) -> Result<(), ServerError> {
    connection
        .sender
        .send(message)
        .map_err(|_| ServerError::ChannelClosed)
}

fn publish_diagnostics(connection: &Connection, params: PublishDiagnosticsParams) -> Result<(), ServerError> {
    let not = Notification::new(notification::PublishDiagnostics::METHOD.to_string(), params);
    send(connection, Message::Notification(not))
}

fn parse_params<P: DeserializeOwned>(method: &str, params: &Value) -> Option<P> {
    match serde_json::from_value(params.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(method, error = %err, "malformed params");
            None
        }
    }
}

fn handle_notification(server: &mut Server, not: &Notification) -> Vec<PublishDiagnosticsParams> {
    let method = not.method.as_str();
    match method {
        notification::DidOpenTextDocument::METHOD => parse_params(method, &not.params)
            .map(|params| server.did_open(params))
            .unwrap_or_default(),
        notification::DidChangeTextDocument::METHOD => parse_params(method, &not.params)
            .map(|params| server.did_change(params))
            .unwrap_or_default(),
        notification::DidCloseTextDocument::METHOD => parse_params(method, &not.params)
            .map(|params| server.did_close(params))
            .unwrap_or_default(),
        notification::DidSaveTextDocument::METHOD => parse_params(method, &not.params)
            .map(|params| server.did_save(params))
            .unwrap_or_default(),
        _ => {
            debug!(method, "ignoring notification");
            Vec::new()
        }
    }
}

/// Answer with the handler's result, or `null` when the params do not parse.
fn respond<P, R>(req: &Request, handler: impl FnOnce(P) -> R) -> Response
where
    P: DeserializeOwned,
    R: Serialize,
{
    match parse_params(&req.method, &req.params) {
        Some(params) => Response::new_ok(req.id.clone(), handler(params)),
        None => Response::new_ok(req.id.clone(), Value::Null),
    }
}

fn handle_request(
    connection: &Connection,
    server: &mut Server,
    req: &Request,
    outgoing: &mut OutgoingRequests,
) -> Result<(), ServerError> {
    let response = match req.method.as_str() {
        request::HoverRequest::METHOD => respond(req, |params| server.hover(params)),
        request::GotoDefinition::METHOD => respond(req, |params| server.definition(params)),
        request::References::METHOD => respond(req, |params| server.references(params)),
        request::DocumentSymbolRequest::METHOD => {
            respond(req, |params| server.document_symbols(params))
        }
        request::CodeLensRequest::METHOD => respond(req, |params| server.code_lens(params)),
        request::CodeActionRequest::METHOD => respond(req, |params| server.code_action(params)),
        request::ExecuteCommand::METHOD => {
            match parse_params(&req.method, &req.params).map(|params| server.execute_command(params)) {
                None => Response::new_ok(req.id.clone(), Value::Null),
                Some(Ok(outcome)) => {
                    for edit in outcome.edits {
                        let request =
                            Request::new(outgoing.next_id(), request::ApplyWorkspaceEdit::METHOD.to_string(), edit);
                        send(connection, Message::Request(request))?;
                    }
                    if let Some(message) = outcome.message {
                        let params = ShowMessageRequestParams {
                            typ: MessageType::INFO,
                            message,
                            actions: None,
                        };
                        let request =
                            Request::new(outgoing.next_id(), request::ShowMessageRequest::METHOD.to_string(), params);
                        send(connection, Message::Request(request))?;
                    }
                    Response::new_ok(req.id.clone(), outcome.result)
                }
                Some(Err(err)) => {
                    warn!(error = %err, "command failed");
                    let code = match err {
                        CommandError::Unsupported(_) => ErrorCode::MethodNotFound,
                        CommandError::InvalidArguments { .. } => ErrorCode::InvalidParams,
                    };
                    Response::new_err(req.id.clone(), code as i32, err.to_string())
                }
            }
        }
        _ => {
            debug!(method = %req.method, "unhandled request");
            Response::new_err(
                req.id.clone(),
                ErrorCode::MethodNotFound as i32,
                format!("unhandled method {}", req.method),
            )
        }
    };
    send(connection, Message::Response(response))
}
