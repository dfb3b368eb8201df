use crate::message::Message;
use crate::VertexId;

use std::sync::mpsc;

use tracing::warn;

enum ChannelMessage<M> {
    Content(Message<M>),
    HaltCmd,
}

/// One worker's end of the all-to-all message mesh. Messages are routed to
/// the worker owning the receiver; a halt command from every worker closes
/// the superstep.
pub(crate) struct Channel<M> {
    receiver: mpsc::Receiver<ChannelMessage<M>>,
    senders: Vec<mpsc::Sender<ChannelMessage<M>>>,
}

/// The worker a vertex lives on.
pub(crate) fn owner(id: VertexId, n_workers: usize) -> usize {
    id.rem_euclid(n_workers as i64) as usize
}

impl<M> Channel<M> {
    /// One channel per worker, indexed by worker id.
    pub fn create(n: usize) -> Vec<Channel<M>> {
        let mut receivers = Vec::with_capacity(n);
        let mut senderss: Vec<Vec<_>> = (0..n).map(|_| Vec::with_capacity(n)).collect();
        for _ in 0..n {
            let (sender, receiver) = mpsc::channel();
            for senders in &mut senderss {
                senders.push(sender.clone());
            }
            receivers.push(receiver);
        }

        receivers
            .into_iter()
            .zip(senderss)
            .map(|(receiver, senders)| Channel { receiver, senders })
            .collect()
    }

    pub fn send(&self, message: Message<M>) {
        let index = owner(message.receiver, self.senders.len());
        if let Err(e) = self.senders[index].send(ChannelMessage::Content(message)) {
            warn!(worker = index, "send message failed: {}", e);
        }
    }

    pub fn send_done(&self) {
        for (index, sender) in self.senders.iter().enumerate() {
            if let Err(e) = sender.send(ChannelMessage::HaltCmd) {
                warn!(worker = index, "send halt command failed: {}", e);
            }
        }
    }
}

impl<'a, M> IntoIterator for &'a Channel<M> {
    type Item = Message<M>;
    type IntoIter = ChannelIterator<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        ChannelIterator {
            hlt_cnt: 0,
            channel: self,
        }
    }
}

/// Yields incoming messages until every worker has sent its halt command.
pub(crate) struct ChannelIterator<'a, M> {
    hlt_cnt: usize,
    channel: &'a Channel<M>,
}

impl<'a, M> Iterator for ChannelIterator<'a, M> {
    type Item = Message<M>;

    fn next(&mut self) -> Option<Message<M>> {
        if self.hlt_cnt >= self.channel.senders.len() {
            return None;
        }

        while let Ok(channel_message) = self.channel.receiver.recv() {
            match channel_message {
                ChannelMessage::Content(message) => return Some(message),
                ChannelMessage::HaltCmd => {
                    self.hlt_cnt += 1;
                    if self.hlt_cnt >= self.channel.senders.len() {
                        return None;
                    }
                }
            }
        }

        None
    }
}
