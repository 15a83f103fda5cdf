//! Participant bookkeeping on the authority: connection lifecycle, pending
//! action queues and per-actor sequence tracking. Requests are buffered as
//! they arrive and drained once per tick in sequence order, which is the
//! serialization point that keeps validations for one entity from
//! interleaving. Duplicate and stale sequences are dropped here, so
//! re-delivered datagrams never reach the validator twice.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use log::info;
use shared::{ActionRequest, Vec2};

#[derive(Debug)]
pub struct Participant {
    pub id: u32,
    pub addr: SocketAddr,
    pub last_seen: Instant,
    /// Highest action sequence already consumed for this participant.
    pub last_processed: u32,
    pending: Vec<ActionRequest>,
    /// Newest movement intent received, by sequence.
    intent: Option<(u32, Vec2)>,
}

impl Participant {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            last_processed: 0,
            pending: Vec::new(),
            intent: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Buffers a request unless its sequence was already processed. Keeps
    /// the buffer sequence-sorted so out-of-order delivery is harmless.
    pub fn add_request(&mut self, request: ActionRequest) {
        self.touch();
        if request.sequence <= self.last_processed {
            return;
        }
        if self.pending.iter().any(|r| r.sequence == request.sequence) {
            return;
        }
        self.pending.push(request);
        self.pending.sort_by_key(|r| r.sequence);
    }

    pub fn record_intent(&mut self, sequence: u32, input: Vec2) {
        self.touch();
        if self.intent.map_or(true, |(seq, _)| sequence > seq) {
            self.intent = Some((sequence, input));
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

pub struct ClientManager {
    participants: HashMap<u32, Participant>,
    next_client_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            participants: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.participants.len() >= self.max_clients {
            return None;
        }
        let client_id = self.next_client_id;
        self.next_client_id += 1;
        info!("Participant {} connected from {}", client_id, addr);
        self.participants.insert(client_id, Participant::new(client_id, addr));
        Some(client_id)
    }

    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(participant) = self.participants.remove(client_id) {
            info!("Participant {} disconnected", participant.id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.participants
            .iter()
            .find(|(_, p)| p.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn add_request(&mut self, client_id: u32, request: ActionRequest) -> bool {
        if let Some(participant) = self.participants.get_mut(&client_id) {
            participant.add_request(request);
            true
        } else {
            false
        }
    }

    pub fn record_intent(&mut self, client_id: u32, sequence: u32, input: Vec2) -> bool {
        if let Some(participant) = self.participants.get_mut(&client_id) {
            participant.record_intent(sequence, input);
            true
        } else {
            false
        }
    }

    /// Drains every pending request, sequence-ordered per participant, and
    /// advances each participant's processed watermark. Consuming on drain
    /// means a rejected request is spent exactly like an accepted one.
    pub fn take_requests(&mut self) -> Vec<(u32, ActionRequest)> {
        let mut drained = Vec::new();
        for (client_id, participant) in self.participants.iter_mut() {
            for request in std::mem::take(&mut participant.pending) {
                participant.last_processed = participant.last_processed.max(request.sequence);
                drained.push((*client_id, request));
            }
        }
        drained
    }

    /// Takes the newest movement intent per participant, if any arrived.
    pub fn take_intents(&mut self) -> Vec<(u32, Vec2)> {
        self.participants
            .iter_mut()
            .filter_map(|(client_id, p)| p.intent.take().map(|(_, input)| (*client_id, input)))
            .collect()
    }

    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.participants.iter().map(|(id, p)| (*id, p.addr)).collect()
    }

    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .participants
            .iter()
            .filter(|(_, p)| p.is_timed_out(self.timeout))
            .map(|(id, _)| *id)
            .collect();
        for client_id in &timed_out {
            self.remove_client(client_id);
        }
        timed_out
    }
}
