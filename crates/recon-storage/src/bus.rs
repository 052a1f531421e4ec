use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use recon_ports::{BusMessage, EventBus, Topic};
use recon_types::ReconResult;

/// Reference [`EventBus`]: one FIFO queue per topic, guarded by a single
/// mutex. Good enough for an in-process pipeline and for tests; a durable
/// deployment swaps this for a real broker behind the same trait.
#[derive(Default)]
pub struct InMemoryEventBus {
    queues: Mutex<HashMap<Topic, VecDeque<BusMessage>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, message: BusMessage) -> ReconResult<()> {
        let topic = message.topic();
        self.queues.lock().entry(topic).or_default().push_back(message);
        Ok(())
    }

    async fn poll(&self, topic: Topic) -> ReconResult<Option<BusMessage>> {
        Ok(self
            .queues
            .lock()
            .get_mut(&topic)
            .and_then(|queue| queue.pop_front()))
    }
}
