//! Mapping from queue records to Prometheus exposition lines.

use std::fmt::Write;

use crate::queue::QueueRecord;

/// Label carrying the queue name on every exported series.
pub const QUEUE_LABEL: &str = "queue";

/// Per-queue gauges, in the order they are written for each queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMetric {
    Messages,
    MessageBytes,
    MessagesReady,
    MessagesUnacknowledged,
    Consumers,
}

impl QueueMetric {
    /// All metrics in exposition order.
    pub const ALL: [QueueMetric; 5] = [
        QueueMetric::Messages,
        QueueMetric::MessageBytes,
        QueueMetric::MessagesReady,
        QueueMetric::MessagesUnacknowledged,
        QueueMetric::Consumers,
    ];

    /// Full Prometheus metric name.
    pub fn name(&self) -> &'static str {
        match self {
            QueueMetric::Messages => "rabbitmq_queue_messages",
            QueueMetric::MessageBytes => "rabbitmq_queue_message_bytes",
            QueueMetric::MessagesReady => "rabbitmq_queue_messages_ready",
            QueueMetric::MessagesUnacknowledged => "rabbitmq_queue_messages_unacknowledged",
            QueueMetric::Consumers => "rabbitmq_queue_consumers",
        }
    }

    /// Read this metric's value from a queue record.
    pub fn value(&self, queue: &QueueRecord) -> u64 {
        match self {
            QueueMetric::Messages => queue.messages,
            QueueMetric::MessageBytes => queue.message_bytes,
            QueueMetric::MessagesReady => queue.messages_ready,
            QueueMetric::MessagesUnacknowledged => queue.messages_unacknowledged,
            QueueMetric::Consumers => queue.consumers,
        }
    }
}

/// Render queues in exposition format.
///
/// Ephemeral queues are skipped. The remaining queues keep the order the
/// broker returned them in, each contributing one line per [`QueueMetric`].
pub fn render_queues(queues: &[QueueRecord]) -> String {
    let mut output = String::with_capacity(queues.len() * 5 * 64);

    for queue in queues.iter().filter(|q| !q.is_ephemeral()) {
        let label = escape_label_value(&queue.name);
        for metric in QueueMetric::ALL {
            writeln!(
                output,
                "{}{{{}=\"{}\"}} {}",
                metric.name(),
                QUEUE_LABEL,
                label,
                metric.value(queue)
            )
            .ok();
        }
    }

    output
}

/// Escape special characters in label values.
pub fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}
