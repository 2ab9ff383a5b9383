use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tileflow_core::{DomainResult, Entity, ModelId, OrderId, StockItemId, ValueObject};

/// Order status lifecycle.
///
/// `created → {retira | enviar | instalacion} → entregado`, with `remitado`
/// reachable from any non-terminal state once a delivery receipt is attached
/// (record-keeping only; no ledger effect). `entregado` is terminal and only
/// legal from the three holding states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    /// Customer picks the order up.
    Retira,
    /// Order ships out.
    Enviar,
    /// Order is installed on site.
    Instalacion,
    /// A delivery receipt document is attached.
    Remitado,
    /// Delivered (terminal).
    Entregado,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Entregado)
    }

    /// Holding states from which the jump to `entregado` is legal.
    pub fn delivery_ready(self) -> bool {
        matches!(
            self,
            OrderStatus::Retira | OrderStatus::Enviar | OrderStatus::Instalacion
        )
    }

    fn accepts(self, next: OrderStatus) -> bool {
        match next {
            // `created` exists only as the initial state.
            OrderStatus::Created => false,
            OrderStatus::Retira | OrderStatus::Enviar | OrderStatus::Instalacion => {
                !self.is_terminal()
            }
            OrderStatus::Remitado => !self.is_terminal(),
            OrderStatus::Entregado => self.delivery_ready(),
        }
    }

    /// Checked transition; an illegal move reports `InvalidTransition` and
    /// leaves the caller's state untouched.
    pub fn transition(self, next: OrderStatus) -> DomainResult<OrderStatus> {
        if self.accepts(next) {
            Ok(next)
        } else {
            Err(tileflow_core::DomainError::invalid_transition(self, next))
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderStatus::Created => "created",
            OrderStatus::Retira => "retira",
            OrderStatus::Enviar => "enviar",
            OrderStatus::Instalacion => "instalacion",
            OrderStatus::Remitado => "remitado",
            OrderStatus::Entregado => "entregado",
        };
        f.write_str(s)
    }
}

/// Per-line fulfillment status. Advances forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFulfillment {
    /// Could not be reserved yet; waits in the backorder queue.
    Pending,
    /// Reserved against ledger capacity.
    Available,
    /// Settled and shipped.
    Delivered,
}

/// Three-way pricing tag on a line; `Plain` means untagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaterialTier {
    #[default]
    Plain,
    Materials,
    Adhesive,
    GroutSeal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Credit,
    Transfer,
}

/// Customer block embedded in the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub address: String,
    pub contact: String,
}

impl ValueObject for Customer {}

/// One product request within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: StockItemId,
    pub model_id: ModelId,
    /// Ordered quantity in area units (m²).
    pub quantity: f64,
    pub materials: MaterialTier,
    pub fulfillment: LineFulfillment,
}

impl OrderLine {
    pub fn is_unresolved_for(&self, item_id: StockItemId) -> bool {
        self.item_id == item_id && self.fulfillment != LineFulfillment::Available
    }
}

/// Line as it arrives from the request layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDraft {
    pub item_id: StockItemId,
    pub model_id: ModelId,
    pub quantity: f64,
    #[serde(default)]
    pub materials: MaterialTier,
}

/// Order-creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    /// Receipt ("remito") number: the FIFO sequence key.
    pub sequence: u64,
    pub customer: Customer,
    pub lines: Vec<LineDraft>,
    pub payment_method: PaymentMethod,
    pub freight: f64,
    pub discount_pct: f64,
    pub advance: f64,
    pub installation_value: f64,
    /// Outstanding balance as reported by the request layer.
    pub pending_balance: f64,
    pub placed_at: DateTime<Utc>,
}

/// Order-edit request. The sequence number and placement time are fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub customer: Customer,
    pub lines: Vec<LineDraft>,
    pub payment_method: PaymentMethod,
    pub freight: f64,
    pub discount_pct: f64,
    pub advance: f64,
    pub installation_value: f64,
    pub pending_balance: f64,
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    sequence: u64,
    customer: Customer,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    payment_method: PaymentMethod,
    total: f64,
    pending_balance: f64,
    discount_pct: f64,
    advance: f64,
    freight: f64,
    installation_value: f64,
    placed_at: DateTime<Utc>,
    /// Attached delivery-receipt references (the documents live elsewhere).
    receipts: Vec<String>,
}

impl Order {
    /// Assemble an order from a validated draft and its resolved lines.
    ///
    /// Reservation decisions live in the reservation manager; this only
    /// builds the record.
    pub fn place(draft: OrderDraft, lines: Vec<OrderLine>) -> Self {
        Self {
            id: OrderId::new(),
            sequence: draft.sequence,
            customer: draft.customer,
            status: OrderStatus::Created,
            lines,
            payment_method: draft.payment_method,
            total: 0.0,
            pending_balance: draft.pending_balance,
            discount_pct: draft.discount_pct,
            advance: draft.advance,
            freight: draft.freight,
            installation_value: draft.installation_value,
            placed_at: draft.placed_at,
            receipts: Vec::new(),
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn pending_balance(&self) -> f64 {
        self.pending_balance
    }

    pub fn discount_pct(&self) -> f64 {
        self.discount_pct
    }

    pub fn advance(&self) -> f64 {
        self.advance
    }

    pub fn freight(&self) -> f64 {
        self.freight
    }

    pub fn installation_value(&self) -> f64 {
        self.installation_value
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    pub fn receipts(&self) -> &[String] {
        &self.receipts
    }

    pub fn set_total(&mut self, total: f64) {
        self.total = total;
    }

    /// Whether any line for `item_id` still waits on stock.
    pub fn has_unresolved_line_for(&self, item_id: StockItemId) -> bool {
        self.lines.iter().any(|l| l.is_unresolved_for(item_id))
    }

    /// Checked status move.
    pub fn transition_to(&mut self, next: OrderStatus) -> DomainResult<()> {
        self.status = self.status.transition(next)?;
        Ok(())
    }

    /// Attach a delivery-receipt reference; the order becomes `remitado`.
    pub fn attach_receipt(&mut self, reference: impl Into<String>) -> DomainResult<()> {
        self.transition_to(OrderStatus::Remitado)?;
        self.receipts.push(reference.into());
        Ok(())
    }

    /// Flip every not-yet-available line for `item_id` to `available`.
    /// Returns how many lines were promoted.
    pub fn promote_lines(&mut self, item_id: StockItemId) -> usize {
        let mut promoted = 0;
        for line in &mut self.lines {
            if line.is_unresolved_for(item_id) {
                line.fulfillment = LineFulfillment::Available;
                promoted += 1;
            }
        }
        promoted
    }

    /// Replace the editable fields wholesale (the reservation manager has
    /// already settled the ledger deltas).
    pub fn apply_edit(&mut self, update: OrderUpdate, lines: Vec<OrderLine>) {
        self.customer = update.customer;
        self.lines = lines;
        self.payment_method = update.payment_method;
        self.freight = update.freight;
        self.discount_pct = update.discount_pct;
        self.advance = update.advance;
        self.installation_value = update.installation_value;
        self.pending_balance = update.pending_balance;
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [OrderLine] {
        &mut self.lines
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
