use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::debug;

/// Por qué terminó la vida de un track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceReason {
    /// El stream llegó a su fin (o el transporte lo cortó).
    Finished,
    /// Un skip aprobado por votos o por el solicitante.
    Skipped,
    /// El estado del guild se reinició; no hay que buscar relleno.
    Cancelled,
}

struct Slot {
    generation: u64,
    sender: Option<oneshot::Sender<AdvanceReason>>,
}

/// Señal de avance de un solo uso, re-armable en cada ciclo.
///
/// Cada `arm` abre una generación nueva y descarta la anterior, así un
/// callback de fin que llega tarde no puede disparar el ciclo siguiente.
pub struct AdvanceSignal {
    slot: Mutex<Slot>,
}

impl AdvanceSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot {
                generation: 0,
                sender: None,
            }),
        })
    }

    /// Arma la señal para un ciclo nuevo.
    pub fn arm(self: &Arc<Self>) -> (EndNotifier, AdvanceWaiter) {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.slot.lock();
        slot.generation += 1;
        // Un sender previo sin disparar se descarta: su waiter ve `Cancelled`
        slot.sender = Some(tx);

        (
            EndNotifier {
                signal: Arc::downgrade(self),
                generation: slot.generation,
            },
            AdvanceWaiter { rx },
        )
    }

    /// Dispara el ciclo en curso, sea cual sea su generación.
    pub fn fire_current(&self, reason: AdvanceReason) -> bool {
        let sender = self.slot.lock().sender.take();
        Self::send(sender, reason)
    }

    /// Dispara sólo si `generation` sigue siendo la del ciclo en curso.
    pub fn fire_if(&self, generation: u64, reason: AdvanceReason) -> bool {
        let sender = {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                debug!(
                    "Ignorando fin de track obsoleto (gen {} != {})",
                    generation, slot.generation
                );
                return false;
            }
            slot.sender.take()
        };
        Self::send(sender, reason)
    }

    /// Cancela el ciclo en curso sin nombrar un motivo de fin.
    pub fn cancel(&self) -> bool {
        self.fire_current(AdvanceReason::Cancelled)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().sender.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    fn send(sender: Option<oneshot::Sender<AdvanceReason>>, reason: AdvanceReason) -> bool {
        match sender {
            Some(tx) => tx.send(reason).is_ok(),
            None => false,
        }
    }
}

/// Lado que espera el motor; se consume una sola vez por ciclo.
pub struct AdvanceWaiter {
    rx: oneshot::Receiver<AdvanceReason>,
}

impl AdvanceWaiter {
    pub async fn wait(self) -> AdvanceReason {
        self.rx.await.unwrap_or(AdvanceReason::Cancelled)
    }
}

/// Callback de fin atado a la generación en la que se armó la señal.
#[derive(Clone)]
pub struct EndNotifier {
    signal: Weak<AdvanceSignal>,
    generation: u64,
}

impl EndNotifier {
    pub fn notify(&self, reason: AdvanceReason) -> bool {
        match self.signal.upgrade() {
            Some(signal) => signal.fire_if(self.generation, reason),
            None => false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for EndNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndNotifier")
            .field("generation", &self.generation)
            .finish()
    }
}
