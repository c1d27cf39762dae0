use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::info;

use crate::intent::registry::IntentHandler;
use crate::intent::types::{IntentKind, ParsedIntent};
use crate::store::budget::CategoryType;
use crate::store::Store;

const INVALID_AMOUNT: &str = "❌ Please provide a valid amount";

/// Positive amount, tolerating a leading currency symbol.
fn parse_amount(token: &str) -> Option<f64> {
    let amount: f64 = token
        .trim_start_matches(['$', '€', '£', '₹'])
        .replace(',', "")
        .parse()
        .ok()?;
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

/// First day of the month containing `now`, and of the month after.
fn month_bounds(now: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    Some((first.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN)))
}

#[derive(Debug, PartialEq)]
struct Transaction<'a> {
    amount: f64,
    category: &'a str,
    description: Option<&'a str>,
}

#[derive(Debug, PartialEq)]
enum TransactionProblem {
    MissingParts,
    InvalidAmount,
}

/// `<amount> <category> [description]`, or a classifier `amount` with the
/// category in the structured field.
fn parse_transaction<'a>(
    intent: &'a ParsedIntent,
    content: &'a str,
) -> Result<Transaction<'a>, TransactionProblem> {
    let content = content.trim();

    if intent.attributes.contains_key("amount") {
        let amount = intent
            .attribute_f64("amount")
            .filter(|a| a.is_finite() && *a > 0.0)
            .ok_or(TransactionProblem::InvalidAmount)?;
        let category = intent
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("general");
        return Ok(Transaction {
            amount,
            category,
            description: Some(content).filter(|c| !c.is_empty()),
        });
    }

    let mut parts = content.splitn(3, char::is_whitespace);
    let (Some(amount), Some(category)) = (parts.next().filter(|a| !a.is_empty()), parts.next())
    else {
        return Err(TransactionProblem::MissingParts);
    };
    let amount = parse_amount(amount).ok_or(TransactionProblem::InvalidAmount)?;
    let description = parts.next().map(str::trim).filter(|d| !d.is_empty());
    Ok(Transaction {
        amount,
        category: category.trim(),
        description,
    })
}

/// Drops a leading `word` (case-insensitive) and the whitespace after it.
fn strip_word<'a>(content: &'a str, word: &str) -> &'a str {
    let content = content.trim();
    match content.split_once(char::is_whitespace) {
        Some((head, rest)) if head.eq_ignore_ascii_case(word) => rest.trim(),
        None if content.eq_ignore_ascii_case(word) => "",
        _ => content,
    }
}

/// What a `budget_goal` intent asks for: `BUDGET expense|income|goal|summary ...`.
#[derive(Debug, PartialEq)]
enum BudgetRequest<'a> {
    Summary,
    Record(CategoryType, &'a str),
    Goal(&'a str),
}

fn budget_request(intent: &ParsedIntent) -> BudgetRequest<'_> {
    let content = strip_word(&intent.content, "budget");

    match intent.action.as_deref() {
        Some("summary") => return BudgetRequest::Summary,
        Some("expense") => {
            return BudgetRequest::Record(CategoryType::Expense, strip_word(content, "expense"))
        }
        Some("income") => {
            return BudgetRequest::Record(CategoryType::Income, strip_word(content, "income"))
        }
        _ => {}
    }
    if content.is_empty() {
        return BudgetRequest::Summary;
    }

    let (head, rest) = content
        .split_once(char::is_whitespace)
        .map(|(head, rest)| (head, rest.trim()))
        .unwrap_or((content, ""));
    match head.to_lowercase().as_str() {
        "expense" => BudgetRequest::Record(CategoryType::Expense, rest),
        "income" => BudgetRequest::Record(CategoryType::Income, rest),
        "goal" => BudgetRequest::Goal(rest),
        "summary" => BudgetRequest::Summary,
        _ => {
            // "Budget summary", "show my summary please": no amount means no goal.
            let mentions_summary = content.split_whitespace().any(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .eq_ignore_ascii_case("summary")
            });
            let has_amount = intent.attributes.contains_key("target_amount")
                || content.split_whitespace().any(|w| parse_amount(w).is_some());
            if mentions_summary && !has_amount {
                BudgetRequest::Summary
            } else {
                BudgetRequest::Goal(content)
            }
        }
    }
}

pub struct BudgetHandler {
    store: Store,
}

impl BudgetHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn record(
        &self,
        user_id: &str,
        kind: CategoryType,
        intent: &ParsedIntent,
        content: &str,
    ) -> Result<String> {
        let label = match kind {
            CategoryType::Expense => "Expense",
            CategoryType::Income => "Income",
        };
        let tx = match parse_transaction(intent, content) {
            Ok(tx) => tx,
            Err(TransactionProblem::MissingParts) => {
                return Ok(format!(
                    "❌ Please provide amount and category. Format: {} [amount] [category] [description]",
                    kind.as_str()
                ))
            }
            Err(TransactionProblem::InvalidAmount) => return Ok(INVALID_AMOUNT.to_string()),
        };

        let payment_method = match kind {
            CategoryType::Expense => intent.attribute_str("payment_method").unwrap_or("cash"),
            CategoryType::Income => "bank_transfer",
        };

        self.store
            .add_transaction(
                user_id,
                kind,
                tx.category,
                tx.amount,
                tx.description,
                payment_method,
            )
            .await?;
        info!("{} of {} recorded for user {}", label, tx.amount, user_id);
        Ok(format!(
            "✅ {} of {} added to {} category!",
            label, tx.amount, tx.category
        ))
    }

    async fn goal(&self, user_id: &str, intent: &ParsedIntent, content: &str) -> Result<String> {
        let (category, amount, name) = match intent.attributes.get("target_amount") {
            Some(_) => (
                intent.category.as_deref().unwrap_or_default(),
                intent.attribute_f64("target_amount"),
                content,
            ),
            None => {
                let mut parts = content.splitn(3, char::is_whitespace);
                (
                    parts.next().unwrap_or_default(),
                    parts.next().and_then(parse_amount),
                    parts.next().unwrap_or_default().trim(),
                )
            }
        };

        if category.is_empty() || name.is_empty() {
            return Ok("❌ Please provide category, target amount, and goal name. Format: goal [category] [amount] [name]".to_string());
        }
        let Some(amount) = amount.filter(|a| *a > 0.0) else {
            return Ok("❌ Please provide a valid target amount".to_string());
        };

        let Some(category_id) = self
            .store
            .find_budget_category(user_id, category, CategoryType::Expense)
            .await?
        else {
            return Ok("❌ Category not found. Please create the category first.".to_string());
        };

        self.store
            .add_budget_goal(user_id, &category_id, name, amount, Local::now().naive_local())
            .await?;
        Ok(format!(
            "✅ Budget goal \"{}\" set for {} category with target of {}!",
            name, category, amount
        ))
    }

    async fn summary(&self, user_id: &str) -> Result<String> {
        let now = Local::now().naive_local();
        let (from, to) = month_bounds(now).ok_or_else(|| anyhow::anyhow!("month out of range"))?;
        let totals = self.store.budget_totals(user_id, from, to).await?;
        let goals = self.store.active_budget_goals(user_id).await?;

        let mut reply = format!(
            "📊 Monthly Budget Summary:\n\nIncome: {}\nExpenses: {}\nBalance: {}",
            totals.income,
            totals.expenses,
            totals.balance()
        );
        if !goals.is_empty() {
            reply.push_str("\n\nActive Goals:");
            for goal in goals {
                reply.push_str(&format!(
                    "\n{} ({}): {}/{} ({:.1}%)",
                    goal.name,
                    goal.category,
                    goal.current_amount,
                    goal.target_amount,
                    goal.percent()
                ));
            }
        }
        Ok(reply)
    }
}

#[async_trait]
impl IntentHandler for BudgetHandler {
    async fn handle(&self, user_id: &str, intent: &ParsedIntent) -> Result<String> {
        match intent.intent {
            IntentKind::Expense => {
                self.record(user_id, CategoryType::Expense, intent, &intent.content)
                    .await
            }
            IntentKind::Income => {
                self.record(user_id, CategoryType::Income, intent, &intent.content)
                    .await
            }
            _ => match budget_request(intent) {
                BudgetRequest::Summary => self.summary(user_id).await,
                BudgetRequest::Record(kind, content) => {
                    self.record(user_id, kind, intent, content).await
                }
                BudgetRequest::Goal(content) => self.goal(user_id, intent, content).await,
            },
        }
    }
}
