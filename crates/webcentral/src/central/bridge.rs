//! Bridges the platform's push-callback notification mechanism into
//! pull-style, cancellable streams.
//!
//! Per characteristic there is at most one live registration: the platform
//! listener token, the stream sender, and a clone of the foreign handle for
//! teardown. The table is guarded by a single mutex so a `stop` and an
//! in-flight callback delivery never race.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;

use super::types::Characteristic;
use crate::error::CentralError;
use crate::platform::CharacteristicHandle;

type ValueSender = mpsc::UnboundedSender<Result<Vec<u8>, CentralError>>;

struct Registration<C> {
    token: crate::platform::ListenerToken,
    sender: ValueSender,
    handle: C,
}

type Table<C> = Arc<Mutex<HashMap<Characteristic, Registration<C>>>>;

pub(crate) struct NotificationBridge<C: CharacteristicHandle> {
    table: Table<C>,
}

impl<C: CharacteristicHandle> NotificationBridge<C> {
    pub fn new() -> Self {
        NotificationBridge {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_notifying(&self, characteristic: &Characteristic) -> bool {
        self.table.lock().unwrap().contains_key(characteristic)
    }

    /// Starts notifications on the platform and registers a listener that
    /// routes each payload through the table to the returned stream.
    pub async fn start(
        &self,
        characteristic: Characteristic,
        handle: C,
    ) -> Result<NotificationStream<C>, CentralError> {
        if self.is_notifying(&characteristic) {
            return Err(CentralError::AlreadyNotifying);
        }

        handle.start_notifications().await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let token = {
            let table: Weak<_> = Arc::downgrade(&self.table);
            let key = characteristic.clone();
            handle.add_value_listener(Box::new(move |payload: &[u8]| {
                let Some(table) = table.upgrade() else {
                    return;
                };
                let registrations = table.lock().unwrap();
                match registrations.get(&key) {
                    Some(registration) => {
                        // Consumer gone is fine; drop teardown handles it.
                        let _ = registration.sender.send(Ok(payload.to_vec()));
                    }
                    None => {
                        // Registration always precedes callback delivery.
                        warn!(
                            "dropping notification for unregistered characteristic {}",
                            key.uuid
                        );
                    }
                }
            }))
        };

        {
            let mut registrations = self.table.lock().unwrap();
            // A racing start may have registered while we awaited the platform.
            if registrations.contains_key(&characteristic) {
                drop(registrations);
                handle.remove_value_listener(token);
                let _ = handle.stop_notifications().await;
                return Err(CentralError::AlreadyNotifying);
            }
            registrations.insert(
                characteristic.clone(),
                Registration {
                    token,
                    sender,
                    handle: handle.clone(),
                },
            );
        }

        Ok(NotificationStream {
            inner: UnboundedReceiverStream::new(receiver),
            guard: StreamGuard {
                table: Arc::clone(&self.table),
                key: characteristic,
                runtime: Handle::current(),
            },
        })
    }

    /// Tears down the registration for the characteristic.
    ///
    /// The stream always terminates, even when the platform refuses to stop
    /// notifications; in that case the failure becomes the stream's final
    /// item and is also returned to the caller.
    pub async fn stop(&self, characteristic: &Characteristic) -> Result<(), CentralError> {
        let registration = self
            .table
            .lock()
            .unwrap()
            .remove(characteristic)
            .ok_or(CentralError::NoActiveNotification)?;

        registration.handle.remove_value_listener(registration.token);
        if let Err(err) = registration.handle.stop_notifications().await {
            let _ = registration
                .sender
                .send(Err(CentralError::Platform(err.clone())));
            return Err(err.into());
        }
        Ok(())
    }
}

/// Single-consumer stream of notification payloads for one characteristic.
///
/// Dropping the stream tears the registration down: the platform listener is
/// removed immediately and a best-effort stop request is spawned, so an
/// abandoned stream never leaks a platform-side subscription.
pub struct NotificationStream<C: CharacteristicHandle> {
    inner: UnboundedReceiverStream<Result<Vec<u8>, CentralError>>,
    guard: StreamGuard<C>,
}

struct StreamGuard<C: CharacteristicHandle> {
    table: Table<C>,
    key: Characteristic,
    runtime: Handle,
}

impl<C: CharacteristicHandle> Drop for StreamGuard<C> {
    fn drop(&mut self) {
        // Already empty if the consumer called stop first.
        let registration = self.table.lock().unwrap().remove(&self.key);
        if let Some(registration) = registration {
            debug!(
                "notification stream dropped, stopping notifications for {}",
                self.key.uuid
            );
            registration.handle.remove_value_listener(registration.token);
            let handle = registration.handle;
            self.runtime.spawn(async move {
                if let Err(err) = handle.stop_notifications().await {
                    warn!("failed to stop notifications after stream drop: {}", err);
                }
            });
        }
    }
}

impl<C: CharacteristicHandle> Stream for NotificationStream<C> {
    type Item = Result<Vec<u8>, CentralError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}
