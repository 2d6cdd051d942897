//! Pass events emitted by the delta mesh.
//!
//! A [`PassEvent`] records one payload moving from one cell to one of its
//! Moore neighbors during one tick. [`PassEdge`] is the fixed wire shape
//! the observer serializes verbatim:
//! `{tick, from: {x, y}, to: {x, y}, payload_id, norm, sim}`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::grid::CellCoord;
use crate::ids::PayloadId;

/// Decimal places kept for `norm` and `sim` on the wire.
const WIRE_PRECISION: f64 = 10_000.0;

/// Record of one payload's movement during one mesh step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassEvent {
    /// Mesh tick during which the pass happened.
    pub tick: u64,
    /// Flat index of the sending cell.
    pub from_index: usize,
    /// Flat index of the receiving cell.
    pub to_index: usize,
    /// Sending cell position.
    pub from: CellCoord,
    /// Receiving cell position.
    pub to: CellCoord,
    /// Id of the payload that moved.
    pub payload_id: PayloadId,
    /// L2 norm of the payload vector, as recorded at creation.
    pub payload_norm: f32,
    /// Cosine similarity between the payload and the recipient's vector
    /// at routing time (not the blended score).
    pub similarity: f32,
}

impl PassEvent {
    /// Whether the payload was routed back onto its own cell.
    ///
    /// Only possible on a 1x1 grid, where every Moore neighbor wraps onto
    /// the sender.
    pub const fn is_self_loop(&self) -> bool {
        self.from_index == self.to_index
    }

    /// Project this event onto its wire shape.
    pub fn to_edge(&self) -> PassEdge {
        PassEdge {
            tick: self.tick,
            from: self.from,
            to: self.to,
            payload_id: self.payload_id.clone(),
            norm: round_for_wire(self.payload_norm),
            sim: round_for_wire(self.similarity),
        }
    }
}

/// Wire projection of a [`PassEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PassEdge {
    /// Mesh tick during which the pass happened.
    pub tick: u64,
    /// Sending cell position.
    pub from: CellCoord,
    /// Receiving cell position.
    pub to: CellCoord,
    /// Id of the payload that moved.
    pub payload_id: PayloadId,
    /// Payload norm, rounded to 4 decimals.
    pub norm: f64,
    /// Recipient cosine similarity, rounded to 4 decimals.
    pub sim: f64,
}

fn round_for_wire(value: f32) -> f64 {
    (f64::from(value) * WIRE_PRECISION).round() / WIRE_PRECISION
}
