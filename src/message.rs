use crate::VertexId;

/// How a message is addressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageType {
    /// Delivered to one vertex, possibly the sender itself.
    Global(VertexId),
    /// Delivered to the target of every outgoing edge of the sender, or only
    /// of those edges whose label is listed.
    Adjacent { labels: Vec<String> },
}

impl MessageType {
    pub fn adjacent() -> Self {
        MessageType::Adjacent { labels: Vec::new() }
    }

    pub fn is_adjacent(&self) -> bool {
        matches!(self, MessageType::Adjacent { .. })
    }
}

pub struct Message<M> {
    pub value: M,
    pub mode: MessageType,
    pub sender: VertexId,
    pub receiver: VertexId,
}

impl<M> Message<M> {
    pub fn new(value: M, mode: MessageType, sender: VertexId, receiver: VertexId) -> Self {
        Message {
            value,
            mode,
            sender,
            receiver,
        }
    }
}

/// Message passing as seen by one vertex during one superstep.
pub trait Messenger<M> {
    /// Messages sent to this vertex during the previous superstep.
    fn receive_messages(&mut self) -> Vec<Message<M>>;

    /// Queues `value` for delivery in the next superstep. There is no
    /// acknowledgement.
    fn send_message(&mut self, mode: MessageType, value: M);
}

/// Messenger handed to a vertex by a worker: the vertex's inbox plus an
/// outbox the worker routes once the vertex returns.
pub struct VertexMessenger<M> {
    vertex: VertexId,
    inbox: Vec<Message<M>>,
    pub(crate) outbox: Vec<(MessageType, M)>,
}

impl<M> VertexMessenger<M> {
    pub fn new(vertex: VertexId, inbox: Vec<Message<M>>) -> Self {
        VertexMessenger {
            vertex,
            inbox,
            outbox: Vec::new(),
        }
    }

    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    pub fn sent(&self) -> &[(MessageType, M)] {
        &self.outbox
    }

    pub fn into_sent(self) -> Vec<(MessageType, M)> {
        self.outbox
    }
}

impl<M> Messenger<M> for VertexMessenger<M> {
    fn receive_messages(&mut self) -> Vec<Message<M>> {
        std::mem::take(&mut self.inbox)
    }

    fn send_message(&mut self, mode: MessageType, value: M) {
        self.outbox.push((mode, value));
    }
}
