//! Profitability aggregation over invoices.
//!
//! A read-only fold: invoices are never modified and pricing is never
//! corrected. Sums keep full precision; every reported figure is rounded to
//! two decimals at the end.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use docflow_core::{ClientId, Document, DocumentId, Status};
use docflow_invoicing::Invoice;
use docflow_pricing::{Decimal, round_money};

/// Profit figures for a single invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceProfit {
    pub invoice_id: DocumentId,
    pub number: String,
    pub client_id: Option<ClientId>,
    pub date: Option<NaiveDate>,
    pub status: String,
    pub total: Decimal,
    /// Σ quantity × cost price; lines without a cost count as zero.
    pub cost_basis: Decimal,
    /// `total - cost_basis`.
    pub profit: Decimal,
    /// `profit / total × 100`, or zero when the total is zero.
    pub margin_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientProfit {
    pub client_id: Option<ClientId>,
    pub invoice_count: usize,
    pub revenue: Decimal,
    pub total_profit: Decimal,
}

/// Calendar month an invoice is dated in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl core::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyProfit {
    pub month: YearMonth,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfitabilityReport {
    /// Ranked by margin, best first.
    pub invoices: Vec<InvoiceProfit>,
    /// Ranked by total profit, highest first.
    pub by_client: Vec<ClientProfit>,
    /// Chronological; undated invoices are left out.
    pub by_month: Vec<MonthlyProfit>,
}

#[derive(Default)]
struct Sums {
    count: usize,
    revenue: Decimal,
    cost: Decimal,
}

impl Sums {
    fn add(&mut self, total: Decimal, cost: Decimal) {
        self.count += 1;
        self.revenue += total;
        self.cost += cost;
    }

    fn profit(&self) -> Decimal {
        self.revenue - self.cost
    }
}

fn margin(profit: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        profit / total * Decimal::ONE_HUNDRED
    }
}

impl InvoiceProfit {
    pub fn of(invoice: &Invoice) -> Self {
        let total = invoice.totals().total;
        let cost_basis = invoice.cost_summary().cost_subtotal;
        let profit = total - cost_basis;
        Self {
            invoice_id: invoice.id_typed(),
            number: invoice.number().to_string(),
            client_id: invoice.client_id(),
            date: invoice.date(),
            status: invoice.status().as_str().to_string(),
            total: round_money(total),
            cost_basis: round_money(cost_basis),
            profit: round_money(profit),
            margin_percent: round_money(margin(profit, total)),
        }
    }
}

impl ProfitabilityReport {
    /// Fold invoices of any status into the report.
    pub fn from_invoices<'a, I>(invoices: I) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut ranked = Vec::new();
        let mut clients: BTreeMap<Option<ClientId>, Sums> = BTreeMap::new();
        let mut months: BTreeMap<YearMonth, Sums> = BTreeMap::new();

        for invoice in invoices {
            let total = invoice.totals().total;
            let cost = invoice.cost_summary().cost_subtotal;

            clients.entry(invoice.client_id()).or_default().add(total, cost);
            if let Some(date) = invoice.date() {
                months.entry(YearMonth::of(date)).or_default().add(total, cost);
            }
            ranked.push(InvoiceProfit::of(invoice));
        }

        ranked.sort_by(|a, b| {
            b.margin_percent
                .cmp(&a.margin_percent)
                .then_with(|| a.number.cmp(&b.number))
        });

        let mut by_client: Vec<ClientProfit> = clients
            .into_iter()
            .map(|(client_id, sums)| ClientProfit {
                client_id,
                invoice_count: sums.count,
                revenue: round_money(sums.revenue),
                total_profit: round_money(sums.profit()),
            })
            .collect();
        by_client.sort_by(|a, b| b.total_profit.cmp(&a.total_profit));

        let by_month = months
            .into_iter()
            .map(|(month, sums)| MonthlyProfit {
                month,
                revenue: round_money(sums.revenue),
                cost: round_money(sums.cost),
                profit: round_money(sums.profit()),
            })
            .collect();

        Self {
            invoices: ranked,
            by_client,
            by_month,
        }
    }

    /// The `n` highest-margin invoices.
    pub fn best(&self, n: usize) -> &[InvoiceProfit] {
        &self.invoices[..n.min(self.invoices.len())]
    }

    /// The `n` lowest-margin invoices, worst first.
    pub fn worst(&self, n: usize) -> Vec<&InvoiceProfit> {
        self.invoices.iter().rev().take(n).collect()
    }

    pub fn client(&self, client_id: ClientId) -> Option<&ClientProfit> {
        self.by_client
            .iter()
            .find(|c| c.client_id == Some(client_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docflow_core::{TenantId, execute};
    use docflow_invoicing::{CreateInvoice, InvoiceCommand};
    use docflow_pricing::LineItem;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn invoice(number: &str, client_id: ClientId, date: NaiveDate, lines: Vec<LineItem>) -> Invoice {
        let id = DocumentId::new();
        let mut invoice = Invoice::empty(id);
        execute(
            &mut invoice,
            &InvoiceCommand::CreateInvoice(CreateInvoice {
                tenant_id: TenantId::new(),
                invoice_id: id,
                number: number.to_string(),
                client_id: Some(client_id),
                date,
                due_date: date,
                tax_rate: d("15"),
                lines,
                description: None,
                source: None,
                purchase_order_number: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        invoice
    }

    fn line(qty: &str, price: &str, cost: &str) -> LineItem {
        LineItem::new("item", d(qty), d(price), d(cost)).unwrap()
    }

    fn day(y: i32, m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, dd).unwrap()
    }

    #[test]
    fn profit_is_measured_against_the_taxed_total() {
        let inv = invoice("INV-0001", ClientId::new(), day(2024, 1, 5), vec![line("2", "100", "60")]);
        let p = InvoiceProfit::of(&inv);
        assert_eq!(p.total, d("230.00"));
        assert_eq!(p.cost_basis, d("120"));
        assert_eq!(p.profit, d("110.00"));
        assert_eq!(p.margin_percent, d("47.83"));
    }

    #[test]
    fn zero_total_has_zero_margin() {
        let inv = invoice("INV-0001", ClientId::new(), day(2024, 1, 5), vec![]);
        assert_eq!(InvoiceProfit::of(&inv).margin_percent, Decimal::ZERO);
    }

    #[test]
    fn rollups_by_client_and_month() {
        let acme = ClientId::new();
        let globex = ClientId::new();
        let invoices = vec![
            invoice("INV-0001", acme, day(2024, 1, 5), vec![line("1", "100", "50")]),
            invoice("INV-0002", acme, day(2024, 2, 9), vec![line("1", "100", "90")]),
            invoice("INV-0003", globex, day(2024, 1, 20), vec![line("1", "100", "0")]),
        ];

        let report = ProfitabilityReport::from_invoices(&invoices);

        let numbers: Vec<&str> = report.invoices.iter().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, vec!["INV-0003", "INV-0001", "INV-0002"]);
        assert_eq!(report.best(1)[0].number, "INV-0003");
        assert_eq!(report.worst(1)[0].number, "INV-0002");
        assert_eq!(report.best(10).len(), 3);

        let acme_rollup = report.client(acme).unwrap();
        assert_eq!(acme_rollup.invoice_count, 2);
        assert_eq!(acme_rollup.total_profit, d("90.00"));
        assert_eq!(report.by_client[0].client_id, Some(globex));

        assert_eq!(report.by_month.len(), 2);
        let jan = &report.by_month[0];
        assert_eq!(jan.month.to_string(), "2024-01");
        assert_eq!(jan.revenue, d("230.00"));
        assert_eq!(jan.cost, d("50.00"));
        assert_eq!(jan.profit, d("180.00"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn client_rollups_partition_the_invoices(
                rows in prop::collection::vec((0usize..3, 1u32..50, 1u32..500, 0u32..500), 0..20)
            ) {
                let clients = [ClientId::new(), ClientId::new(), ClientId::new()];
                let invoices: Vec<Invoice> = rows
                    .iter()
                    .enumerate()
                    .map(|(i, (c, q, p, cost))| {
                        invoice(
                            &format!("INV-{i:04}"),
                            clients[*c],
                            day(2024, 1, 1),
                            vec![line(&q.to_string(), &p.to_string(), &cost.to_string())],
                        )
                    })
                    .collect();

                let report = ProfitabilityReport::from_invoices(&invoices);
                let counted: usize = report.by_client.iter().map(|c| c.invoice_count).sum();
                prop_assert_eq!(counted, invoices.len());
                prop_assert_eq!(report.invoices.len(), invoices.len());
                for pair in report.invoices.windows(2) {
                    prop_assert!(pair[0].margin_percent >= pair[1].margin_percent);
                }
            }
        }
    }
}
