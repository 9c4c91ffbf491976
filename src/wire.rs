use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::auth::Authenticator;
use crate::engine::{Engine, EngineError};
use crate::limits::MAX_FRAME_LEN;
use crate::observability::{AUTH_FAILURES_TOTAL, REQUESTS_TOTAL, REQUEST_DURATION_SECONDS};
use crate::protocol::{self, ErrorBody, Notification, NotificationFrame, ProtocolError, Reply, Request};
use crate::tenant::TenantManager;

const OUTBOUND_QUEUE: usize = 256;

#[derive(Debug, thiserror::Error)]
enum RequestError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl RequestError {
    fn body(&self) -> ErrorBody {
        match self {
            RequestError::Engine(e) => ErrorBody::from(e),
            RequestError::Protocol(e) => ErrorBody::from(e),
        }
    }
}

fn json<T: Serialize>(value: T) -> Result<Value, RequestError> {
    serde_json::to_value(value).map_err(|e| RequestError::Protocol(e.into()))
}

fn encode<T: Serialize>(frame: &T) -> Option<String> {
    match serde_json::to_string(frame) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!("failed to encode frame: {e}");
            None
        }
    }
}

/// One authenticated connection: its tenant, caller and live subscriptions.
struct Session {
    engine: Arc<Engine>,
    user: Ulid,
    out: mpsc::Sender<String>,
    listeners: HashMap<Ulid, JoinHandle<()>>,
}

impl Session {
    fn listen(&mut self, channel: Ulid) {
        if self.listeners.contains_key(&channel) {
            return;
        }
        let mut rx = self.engine.notify.subscribe(channel);
        let out = self.out.clone();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => {
                        let frame = NotificationFrame {
                            notification: Notification { channel, change },
                        };
                        let Some(line) = encode(&frame) else { continue };
                        if out.send(line).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%channel, skipped, "listener lagged, notifications dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        self.listeners.insert(channel, handle);
    }

    fn unlisten(&mut self, channel: &Ulid) {
        if let Some(handle) = self.listeners.remove(channel) {
            handle.abort();
        }
        self.engine.notify.prune(channel);
    }

    fn unlisten_all(&mut self) {
        let channels: Vec<Ulid> = self.listeners.keys().copied().collect();
        for channel in channels {
            self.unlisten(&channel);
        }
    }

    async fn handle(&mut self, req: Request) -> Result<Value, RequestError> {
        let engine = self.engine.clone();
        match req {
            Request::RegisterCoach { id, name } => json(engine.register_coach(id, &name).await?),
            Request::RegisterPlayer { id, name } => json(engine.register_player(id, &name).await?),
            Request::GetCoach { id } => json(engine.get_coach(id).await?),
            Request::GetPlayer { id } => json(engine.get_player(id).await?),
            Request::CreateAvailability(new) => json(engine.create_availability(new).await?),
            Request::ListAvailability(filter) => json(engine.list_availability(&filter).await?),
            Request::GetAvailability { id } => json(engine.get_availability(id).await?),
            Request::UpdateAvailability { id, patch } => json(engine.update_availability(id, patch).await?),
            Request::DeleteAvailability { id } => {
                engine.delete_availability(id).await?;
                json(serde_json::json!({ "deleted": id }))
            }
            Request::GetAvailableSlots {
                coach_id,
                start_date,
                end_date,
                session_type,
            } => json(
                engine
                    .available_slots(coach_id, start_date, end_date, session_type.as_deref())
                    .await?,
            ),
            Request::CheckConflicts {
                coach_id,
                player_id,
                start_time,
                end_time,
                exclude_booking_id,
            } => json(
                engine
                    .check_conflicts(coach_id, player_id, start_time, end_time, exclude_booking_id)
                    .await?,
            ),
            Request::ScheduleEvent(new) => json(engine.schedule_event(new).await?),
            Request::GetEvent { id } => json(engine.get_event(id).await?),
            Request::CancelEvent { id, reason } => json(engine.cancel_event(id, &reason).await?),
            Request::CreateBooking(new) => json(engine.create_booking(self.user, new).await?),
            Request::GetBooking { id } => json(engine.get_booking(id).await?),
            Request::ListBookings(query) => json(engine.list_bookings(&query).await?),
            Request::UpdateBooking { id, patch } => json(engine.update_booking(id, patch).await?),
            Request::ConfirmBooking { id } => json(engine.confirm_booking(id).await?),
            Request::CancelBooking { id, reason } => json(engine.cancel_booking(id, &reason).await?),
            Request::CompleteBooking { id } => json(engine.complete_booking(id).await?),
            Request::Listen { channel } => {
                self.listen(channel);
                json(serde_json::json!({ "listening": channel }))
            }
            Request::Unlisten { channel } => {
                self.unlisten(&channel);
                json(serde_json::json!({ "unlistened": channel }))
            }
            Request::UnlistenAll => {
                self.unlisten_all();
                json(serde_json::json!({ "unlistened": "all" }))
            }
        }
    }
}

/// Serve one client: startup/auth handshake, then one reply per request
/// line, with notifications interleaved on the same stream.
pub async fn process_connection(
    socket: TcpStream,
    tenants: Arc<TenantManager>,
    auth: Arc<dyn Authenticator>,
) -> Result<(), ProtocolError> {
    let framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_FRAME_LEN));
    let (mut sink, mut stream) = framed.split();

    // All outbound lines (replies and notifications) go through one writer.
    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    let writer = tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            if sink.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut session = match startup(&mut stream, &tenants, auth.as_ref()).await {
        Ok((engine, user, tenant)) => {
            info!(%tenant, %user, "session started");
            let ready = Reply::ok(serde_json::json!({ "tenant": tenant, "user": user }));
            if let Some(line) = encode(&ready) {
                let _ = out_tx.send(line).await;
            }
            Session {
                engine,
                user,
                out: out_tx.clone(),
                listeners: HashMap::new(),
            }
        }
        Err(e) => {
            if matches!(e, ProtocolError::Unauthorized(_)) {
                metrics::counter!(AUTH_FAILURES_TOTAL).increment(1);
            }
            warn!("startup failed: {e}");
            if let Some(line) = encode(&Reply::error(ErrorBody::from(&e))) {
                let _ = out_tx.send(line).await;
            }
            drop(out_tx);
            let _ = writer.await;
            return Err(e);
        }
    };

    let result = loop {
        let line = match stream.next().await {
            None => break Ok(()),
            Some(Ok(line)) => line,
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                let err = ProtocolError::Codec(LinesCodecError::MaxLineLengthExceeded);
                if let Some(line) = encode(&Reply::error(ErrorBody::from(&err))) {
                    let _ = out_tx.send(line).await;
                }
                continue;
            }
            Some(Err(e)) => break Err(ProtocolError::from(e)),
        };
        if line.trim().is_empty() {
            continue;
        }

        let started = Instant::now();
        let (op, outcome) = match protocol::parse_request(&line) {
            Ok(req) => {
                let op = req.op_label();
                (op, session.handle(req).await)
            }
            Err(e) => ("invalid", Err(RequestError::from(e))),
        };
        let status = if outcome.is_ok() { "ok" } else { "error" };
        metrics::counter!(REQUESTS_TOTAL, "op" => op, "status" => status).increment(1);
        metrics::histogram!(REQUEST_DURATION_SECONDS, "op" => op).record(started.elapsed().as_secs_f64());

        let reply = match outcome {
            Ok(data) => Reply::ok(data),
            Err(e) => {
                debug!(op, "request failed: {e}");
                Reply::error(e.body())
            }
        };
        if let Some(line) = encode(&reply)
            && out_tx.send(line).await.is_err()
        {
            break Ok(());
        }
    };

    session.unlisten_all();
    drop(session);
    drop(out_tx);
    let _ = writer.await;
    result
}

async fn startup<S>(
    stream: &mut S,
    tenants: &TenantManager,
    auth: &dyn Authenticator,
) -> Result<(Arc<Engine>, Ulid, String), ProtocolError>
where
    S: futures::Stream<Item = Result<String, LinesCodecError>> + Unpin,
{
    let line = stream.next().await.ok_or(ProtocolError::NoStartup)??;
    let hello = protocol::parse_startup(&line)?;
    auth.authenticate(&hello.tenant, hello.user, &hello.password).await?;
    let engine = tenants.get_or_create(&hello.tenant).map_err(ProtocolError::Tenant)?;
    Ok((engine, hello.user, hello.tenant))
}
