//! crates/tutoring_core/src/billing.rs
//!
//! Billing and payroll aggregation over the Reviews log and the Billing tab.
//!
//! Revenue is attributed by joining review records to billing profiles on the
//! student's name. Payroll is derived on demand and never persisted.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    billing_columns as col, cell, BillingProfile, BillingType, Currency, PaymentTerms, Tab,
    UnknownVariant, TIMESTAMP_FORMAT,
};
use crate::error::{DomainError, DomainResult};
use crate::ports::{PortError, PortResult, TabularStore};
use crate::reviews::ReviewLog;
use crate::roster::Roster;
use crate::schedule::estimate_monthly_classes;

/// The monetary fields an operator sets on a billing profile.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingTerms {
    pub billing_type: BillingType,
    pub rate: Decimal,
    pub currency: Currency,
    pub payment_terms: PaymentTerms,
}

impl BillingTerms {
    /// Checks the terms before anything is written. Rates may be zero but never
    /// negative.
    pub fn validate(&self) -> DomainResult<()> {
        if self.rate < Decimal::ZERO {
            return Err(DomainError::InvalidInput(format!(
                "rate must not be negative, got {}",
                self.rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherPay {
    pub teacher_name: String,
    pub class_count: usize,
    pub total_revenue: Decimal,
    pub teacher_pay: Decimal,
}

/// Forward-looking class count for a teacher, from the schedules of the students
/// assigned to them.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyProjection {
    pub teacher_name: String,
    pub projected_classes: u32,
    /// Absent unless every contributing student has a per-class or per-hour rate.
    pub projected_revenue: Option<Decimal>,
    pub projected_pay: Option<Decimal>,
    /// Assigned students that block a revenue projection.
    pub unpriced_students: Vec<String>,
}

#[derive(Clone)]
pub struct BillingLedger {
    store: Arc<dyn TabularStore>,
    reviews: ReviewLog,
    roster: Roster,
}

//=========================================================================================
// Pure Calculations
//=========================================================================================

/// Balance owed for `class_count` recorded classes.
///
/// Per-hour and per-class billing are treated alike (no duration weighting).
/// Monthly fixed fees are not derived from history and always yield zero.
pub fn balance_from_history(
    class_count: usize,
    rate: Decimal,
    billing_type: BillingType,
) -> DomainResult<Decimal> {
    match billing_type {
        BillingType::PerHour | BillingType::PerClass => Decimal::from(class_count)
            .checked_mul(rate)
            .ok_or_else(|| overflow("balance")),
        BillingType::MonthlyFixed => Ok(Decimal::ZERO),
    }
}

/// `revenue * share_percent / 100`.
pub fn share_of(revenue: Decimal, share_percent: Decimal) -> DomainResult<Decimal> {
    revenue
        .checked_mul(share_percent)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("teacher pay"))
}

fn overflow(what: &str) -> DomainError {
    DomainError::InvalidInput(format!("{} exceeds the representable amount", what))
}

/// Reads a money cell such as `"5,000"` or `" 4000.50 "`.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let cleaned: String = value.chars().filter(|c| !matches!(c, ',' | ' ')).collect();
    Decimal::from_str(&cleaned).ok()
}

fn check_share(share_percent: Decimal) -> DomainResult<()> {
    if share_percent < Decimal::ZERO || share_percent > Decimal::ONE_HUNDRED {
        return Err(DomainError::InvalidInput(format!(
            "share percent must be between 0 and 100, got {}",
            share_percent
        )));
    }
    Ok(())
}

//=========================================================================================
// Row Mapping
//=========================================================================================

fn profile_from_row(row: &[String]) -> PortResult<BillingProfile> {
    let student_name = cell(row, col::STUDENT_NAME);
    let invalid = |what: String| PortError::InvalidData(format!("billing for {}: {}", student_name, what));
    let billing_type: BillingType = cell(row, col::BILLING_TYPE)
        .parse()
        .map_err(|e: UnknownVariant| invalid(e.to_string()))?;
    let currency: Currency = cell(row, col::CURRENCY)
        .parse()
        .map_err(|e: UnknownVariant| invalid(e.to_string()))?;
    let payment_terms: PaymentTerms = cell(row, col::PAYMENT_TERMS)
        .parse()
        .map_err(|e: UnknownVariant| invalid(e.to_string()))?;
    let rate_cell = cell(row, col::RATE);
    let rate = parse_amount(&rate_cell).ok_or_else(|| invalid(format!("rate '{}'", rate_cell)))?;
    let balance_cell = cell(row, col::CURRENT_BALANCE);
    let current_balance = if balance_cell.is_empty() {
        Decimal::ZERO
    } else {
        parse_amount(&balance_cell).ok_or_else(|| invalid(format!("balance '{}'", balance_cell)))?
    };
    let last_bill_date = Some(cell(row, col::LAST_BILL_DATE)).filter(|d| !d.is_empty());
    Ok(BillingProfile {
        student_name,
        billing_type,
        rate,
        currency,
        payment_terms,
        current_balance,
        last_bill_date,
    })
}

fn profile_to_row(profile: &BillingProfile) -> Vec<String> {
    vec![
        profile.student_name.clone(),
        profile.billing_type.as_str().to_string(),
        profile.rate.to_string(),
        profile.currency.as_str().to_string(),
        profile.payment_terms.as_str().to_string(),
        profile.current_balance.to_string(),
        profile.last_bill_date.clone().unwrap_or_default(),
    ]
}

//=========================================================================================
// Ledger Operations
//=========================================================================================

impl BillingLedger {
    pub fn new(store: Arc<dyn TabularStore>, reviews: ReviewLog, roster: Roster) -> Self {
        Self {
            store,
            reviews,
            roster,
        }
    }

    /// Recorded classes for `student_name` (exact match) priced at `rate`.
    pub async fn historical_balance(
        &self,
        student_name: &str,
        rate: Decimal,
        billing_type: BillingType,
    ) -> DomainResult<Decimal> {
        let class_count = self
            .reviews
            .list_reviews()
            .await?
            .iter()
            .filter(|r| r.student_name == student_name)
            .count();
        balance_from_history(class_count, rate, billing_type)
    }

    /// Readable billing profiles; malformed rows are logged and skipped.
    pub async fn list_profiles(&self) -> DomainResult<Vec<BillingProfile>> {
        let rows = self.store.read_rows(Tab::Billing).await?;
        Ok(rows
            .iter()
            .filter_map(|row| match profile_from_row(row) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable billing row");
                    None
                }
            })
            .collect())
    }

    pub async fn find_profile(&self, student_name: &str) -> DomainResult<Option<BillingProfile>> {
        let rows = self.store.read_rows(Tab::Billing).await?;
        match rows.iter().find(|row| cell(row, col::STUDENT_NAME) == student_name) {
            Some(row) => Ok(Some(profile_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Inserts or overwrites the profile of `student_name`.
    ///
    /// With `recalculate`, the balance is replaced by [`Self::historical_balance`]
    /// and the last-bill date is stamped. Without it, the stored balance cell is
    /// left untouched even when the rate or billing type changed.
    pub async fn update_billing_profile(
        &self,
        student_name: &str,
        terms: &BillingTerms,
        recalculate: bool,
    ) -> DomainResult<BillingProfile> {
        let student_name = student_name.trim();
        if student_name.is_empty() {
            return Err(DomainError::InvalidInput("student name is required".to_string()));
        }
        terms.validate()?;

        let rows = self.store.read_rows(Tab::Billing).await?;
        let existing = rows
            .iter()
            .enumerate()
            .find(|(_, row)| cell(row, col::STUDENT_NAME) == student_name);

        let recalculated = if recalculate {
            let balance = self
                .historical_balance(student_name, terms.rate, terms.billing_type)
                .await?;
            Some((balance, Utc::now().format(TIMESTAMP_FORMAT).to_string()))
        } else {
            None
        };

        let (current_balance, last_bill_date) = match (&recalculated, existing) {
            (Some((balance, stamped)), _) => (*balance, Some(stamped.clone())),
            (None, Some((_, row))) => (
                parse_amount(&cell(row, col::CURRENT_BALANCE)).unwrap_or(Decimal::ZERO),
                Some(cell(row, col::LAST_BILL_DATE)).filter(|d| !d.is_empty()),
            ),
            (None, None) => (Decimal::ZERO, None),
        };
        let profile = BillingProfile {
            student_name: student_name.to_string(),
            billing_type: terms.billing_type,
            rate: terms.rate,
            currency: terms.currency,
            payment_terms: terms.payment_terms,
            current_balance,
            last_bill_date,
        };

        let cells = profile_to_row(&profile);
        match existing {
            Some((row, _)) => {
                let end = if recalculated.is_some() {
                    col::LAST_BILL_DATE
                } else {
                    col::PAYMENT_TERMS
                };
                let values = cells[col::BILLING_TYPE..=end].to_vec();
                self.store
                    .update_range(Tab::Billing, row, col::BILLING_TYPE, end, values)
                    .await?;
            }
            None => self.store.append_row(Tab::Billing, cells).await?,
        }
        info!(
            student = student_name,
            recalculated = recalculate,
            balance = %profile.current_balance,
            "Billing profile saved"
        );
        Ok(profile)
    }

    /// Rate per student name. Rows whose rate cannot be read are left out, so the
    /// student counts as unresolved.
    async fn rate_table(&self) -> DomainResult<HashMap<String, (Decimal, Option<BillingType>)>> {
        let rows = self.store.read_rows(Tab::Billing).await?;
        let mut rates = HashMap::new();
        for row in &rows {
            let Some(rate) = parse_amount(&cell(row, col::RATE)) else {
                continue;
            };
            let billing_type = cell(row, col::BILLING_TYPE).parse().ok();
            rates
                .entry(cell(row, col::STUDENT_NAME))
                .or_insert((rate, billing_type));
        }
        Ok(rates)
    }

    /// Classes taught by `teacher_name` (exact match on the Reviews log), the
    /// revenue they brought in, and the teacher's share of it.
    ///
    /// Students without a readable billing rate contribute nothing to revenue;
    /// that is not an error.
    pub async fn teacher_pay(
        &self,
        teacher_name: &str,
        share_percent: Decimal,
    ) -> DomainResult<TeacherPay> {
        check_share(share_percent)?;
        let rates = self.rate_table().await?;
        let reviews = self.reviews.list_reviews().await?;

        let mut class_count = 0;
        let mut total_revenue = Decimal::ZERO;
        for review in reviews.iter().filter(|r| r.teacher_name == teacher_name) {
            class_count += 1;
            match rates.get(&review.student_name) {
                Some((rate, _)) => {
                    total_revenue = total_revenue
                        .checked_add(*rate)
                        .ok_or_else(|| overflow("revenue"))?;
                }
                None => warn!(
                    teacher = teacher_name,
                    student = %review.student_name,
                    "No billing rate for student; class adds no revenue"
                ),
            }
        }

        Ok(TeacherPay {
            teacher_name: teacher_name.to_string(),
            class_count,
            total_revenue,
            teacher_pay: share_of(total_revenue, share_percent)?,
        })
    }

    /// Projects next month's classes for a teacher from the "Class Times" of the
    /// students assigned to them.
    ///
    /// The count comes from [`estimate_monthly_classes`] and is only an estimate.
    /// Revenue is projected only when the count is non-zero and every student
    /// contributing classes has a per-class or per-hour rate; otherwise no figure
    /// is produced.
    pub async fn project_teacher_month(
        &self,
        teacher_name: &str,
        share_percent: Decimal,
    ) -> DomainResult<MonthlyProjection> {
        check_share(share_percent)?;
        let teacher = self
            .roster
            .find_teacher(teacher_name)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Teacher {} not found", teacher_name)))?;
        let rates = self.rate_table().await?;

        let mut projected_classes = 0u32;
        let mut revenue = Decimal::ZERO;
        let mut unpriced_students = Vec::new();
        for name in teacher.assigned_student_names() {
            let classes = match self.roster.find_student(&name).await? {
                Some(student) => estimate_monthly_classes(&student.class_times),
                None => 0,
            };
            if classes == 0 {
                continue;
            }
            projected_classes += classes;
            match rates.get(&name) {
                Some((rate, Some(BillingType::PerClass | BillingType::PerHour))) => {
                    revenue = Decimal::from(classes)
                        .checked_mul(*rate)
                        .and_then(|amount| revenue.checked_add(amount))
                        .ok_or_else(|| overflow("projected revenue"))?;
                }
                _ => unpriced_students.push(name),
            }
        }

        let projected_revenue =
            (projected_classes > 0 && unpriced_students.is_empty()).then_some(revenue);
        Ok(MonthlyProjection {
            teacher_name: teacher.name,
            projected_classes,
            projected_revenue,
            projected_pay: projected_revenue
                .map(|r| share_of(r, share_percent))
                .transpose()?,
            unpriced_students,
        })
    }
}
