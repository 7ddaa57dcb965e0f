//! The smart-accounting pipeline
//!
//! `analyze → match budget → match account → assemble`. One LLM call in the
//! analyze stage; everything after works over locally fetched candidate
//! data. Analyze and budget matching degrade on failure; the account check
//! is fatal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use tally_llm::{LlmRequestResult, Message, MultiProviderService};
use tally_types::{AccountBook, Budget, Category, TransactionType};

use crate::cache::{ResultCache, DEFAULT_CACHE_TTL};
use crate::error::{AccountingError, Result};
use crate::extract;
use crate::matching;
use crate::prompts;
use crate::sources::{AccountBookSource, BudgetSource, CategorySource};
use crate::types::{
    AnalyzedTransaction, DebugTrace, MatchedBudget, SmartAccountingRequest, SmartAccountingResult,
};

/// Seam between the pipeline and the orchestration layer.
///
/// [`MultiProviderService`] implements this; tests inject scripted
/// generators.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> LlmRequestResult;
}

#[async_trait]
impl TextGenerator for MultiProviderService {
    async fn generate(&self, messages: &[Message]) -> LlmRequestResult {
        self.generate_chat(messages).await
    }
}

/// Tunables for one pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Result cache lifetime
    pub cache_ttl: Duration,
    /// Attach the debug trace to every result, not only on request
    pub debug_always: bool,
    /// Override of the analysis system prompt template
    pub system_prompt_template: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            debug_always: false,
            system_prompt_template: None,
        }
    }
}

/// Outcome of the analysis stage, carried through the rest of the pipeline
struct Analysis {
    transaction: AnalyzedTransaction,
    debug: Option<DebugTrace>,
}

/// The smart-accounting service
pub struct SmartAccounting {
    generator: Arc<dyn TextGenerator>,
    categories: Arc<dyn CategorySource>,
    budgets: Arc<dyn BudgetSource>,
    books: Arc<dyn AccountBookSource>,
    cache: ResultCache,
    options: PipelineOptions,
}

impl SmartAccounting {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        categories: Arc<dyn CategorySource>,
        budgets: Arc<dyn BudgetSource>,
        books: Arc<dyn AccountBookSource>,
    ) -> Self {
        Self {
            generator,
            categories,
            budgets,
            books,
            cache: ResultCache::new(DEFAULT_CACHE_TTL),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.cache = ResultCache::new(options.cache_ttl);
        self.options = options;
        self
    }

    /// Run the whole pipeline for one description.
    ///
    /// Identical `(user, account, description)` requests inside the TTL
    /// window return the cached result without calling the LLM again.
    pub async fn process_description(
        &self,
        request: &SmartAccountingRequest,
    ) -> Result<SmartAccountingResult> {
        if request.user_id.is_empty() {
            return Err(AccountingError::InvalidRequest { field: "userId" });
        }
        if request.account_id.is_empty() {
            return Err(AccountingError::InvalidRequest { field: "accountId" });
        }
        if request.description.trim().is_empty() {
            return Err(AccountingError::InvalidRequest { field: "description" });
        }

        let key = ResultCache::key(&request.user_id, &request.account_id, &request.description);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(user = %request.user_id, "smart accounting cache hit");
            return Ok(cached);
        }

        let analysis = self.analyze(request).await;
        let budget = self.match_budget(request, &analysis.transaction).await;
        let book = self.match_account(request).await?;
        let result = self.assemble(request, analysis, budget, book);

        self.cache.insert(key, result.clone());
        Ok(result)
    }

    // ========================================================================
    // Stage 1: analyze
    // ========================================================================

    /// One LLM call plus lenient parsing and candidate validation.
    ///
    /// Never fails: any problem in this stage degrades to the default
    /// category ("其他", else the first candidate) with confidence 0.5.
    async fn analyze(&self, request: &SmartAccountingRequest) -> Analysis {
        let today = Utc::now().date_naive();

        let categories = match self
            .categories
            .categories_for(&request.user_id, &request.account_id)
            .await
        {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!(error = %e, "category lookup failed, continuing without candidates");
                Vec::new()
            }
        };

        let family_id = self
            .books
            .get(&request.account_id)
            .await
            .ok()
            .flatten()
            .and_then(|b| b.family_id);
        let budgets = self
            .budgets
            .active_budgets(
                &request.user_id,
                &request.account_id,
                family_id.as_deref(),
                today,
            )
            .await
            .unwrap_or_default();

        let template = self
            .options
            .system_prompt_template
            .as_deref()
            .unwrap_or(prompts::DEFAULT_SYSTEM_PROMPT);
        let system_prompt = prompts::render_system_prompt(template, &categories, &budgets, today);
        let user_prompt = prompts::render_user_prompt(&request.description, today);

        let messages = [
            Message::system(system_prompt.clone()),
            Message::user(user_prompt.clone()),
        ];
        let outcome = self.generator.generate(&messages).await;

        let mut debug = DebugTrace {
            system_prompt,
            user_prompt,
            raw_response: outcome.content.clone().unwrap_or_default(),
            parsed: serde_json::Value::Null,
        };

        let Some(raw_response) = outcome.content.filter(|_| outcome.success) else {
            tracing::warn!(
                error = outcome.error.as_deref().unwrap_or("no content"),
                "generation failed, falling back to default category"
            );
            return self.fallback_analysis(request, &categories, debug);
        };

        let Some(json) = extract::first_json_object(&raw_response) else {
            tracing::warn!("model output carried no JSON object, falling back");
            return self.fallback_analysis(request, &categories, debug);
        };
        debug.parsed = serde_json::from_str(json).unwrap_or(serde_json::Value::Null);

        let Some(raw) = extract::parse_analysis(json) else {
            tracing::warn!("model JSON did not match the analysis schema, falling back");
            return self.fallback_analysis(request, &categories, debug);
        };

        // The category must come from the candidate set; the candidate is
        // authoritative for name and direction.
        let Some(category) = raw
            .category_id
            .as_deref()
            .and_then(|id| categories.iter().find(|c| c.id == id))
        else {
            tracing::warn!(
                category = raw.category_id.as_deref().unwrap_or(""),
                "model returned an unknown category, falling back"
            );
            return self.fallback_analysis(request, &categories, debug);
        };

        let transaction = AnalyzedTransaction {
            amount: raw.amount,
            date: extract::coerce_date(raw.date.as_deref(), today),
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            transaction_type: category.transaction_type,
            budget_name: raw.budget_name.filter(|s| !s.is_empty()),
            note: raw.note.unwrap_or_else(|| request.description.clone()),
            confidence: extract::clamp_confidence(raw.confidence),
        };

        Analysis {
            transaction,
            debug: Some(debug),
        }
    }

    /// Degraded analysis: default category, confidence 0.5
    fn fallback_analysis(
        &self,
        request: &SmartAccountingRequest,
        categories: &[Category],
        debug: DebugTrace,
    ) -> Analysis {
        let default = categories
            .iter()
            .find(|c| c.name == "其他")
            .or_else(|| categories.first());

        let transaction = match default {
            Some(category) => AnalyzedTransaction {
                amount: 0.0,
                date: Utc::now().date_naive(),
                category_id: category.id.clone(),
                category_name: category.name.clone(),
                transaction_type: category.transaction_type,
                budget_name: None,
                note: request.description.clone(),
                confidence: 0.5,
            },
            None => AnalyzedTransaction {
                amount: 0.0,
                date: Utc::now().date_naive(),
                category_id: String::new(),
                category_name: "未分类".to_string(),
                transaction_type: TransactionType::Expense,
                budget_name: None,
                note: request.description.clone(),
                confidence: 0.5,
            },
        };

        Analysis {
            transaction,
            debug: Some(debug),
        }
    }

    // ========================================================================
    // Stage 2: match budget
    // ========================================================================

    /// Hint match first, precedence rules otherwise. Degrades to "no
    /// budget" on any internal failure.
    async fn match_budget(
        &self,
        request: &SmartAccountingRequest,
        transaction: &AnalyzedTransaction,
    ) -> Option<MatchedBudget> {
        let family_id = self
            .books
            .get(&request.account_id)
            .await
            .ok()
            .flatten()
            .and_then(|b| b.family_id);

        let candidates = match self
            .budgets
            .active_budgets(
                &request.user_id,
                &request.account_id,
                family_id.as_deref(),
                transaction.date,
            )
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, "budget lookup failed, continuing without a budget");
                return None;
            }
        };

        if let Some(hint) = transaction.budget_name.as_deref() {
            if let Some(hit) = matching::match_by_hint(hint, &candidates) {
                tracing::debug!(budget = %hit.id, hint, "budget matched by name hint");
                return Some(matched(hit));
            }
        }

        matching::match_by_precedence(
            &request.user_id,
            &request.account_id,
            &transaction.category_id,
            transaction.date,
            &candidates,
        )
        .map(|hit| {
            tracing::debug!(budget = %hit.id, "budget matched by precedence");
            matched(hit)
        })
    }

    // ========================================================================
    // Stage 3: match account (fatal)
    // ========================================================================

    /// Re-verify the account book exists and the requester has access.
    /// The persisted record's type wins over the caller's claim.
    async fn match_account(&self, request: &SmartAccountingRequest) -> Result<AccountBook> {
        let book = self
            .books
            .find_accessible(&request.account_id, &request.user_id)
            .await
            .map_err(|e| AccountingError::internal(e.to_string()))?;

        book.ok_or_else(|| AccountingError::Unauthorized {
            account_id: request.account_id.clone(),
            user_id: request.user_id.clone(),
        })
    }

    // ========================================================================
    // Stage 4: assemble
    // ========================================================================

    fn assemble(
        &self,
        request: &SmartAccountingRequest,
        analysis: Analysis,
        budget: Option<MatchedBudget>,
        book: AccountBook,
    ) -> SmartAccountingResult {
        let transaction = analysis.transaction;
        let debug = (request.include_debug || self.options.debug_always)
            .then_some(analysis.debug)
            .flatten();

        SmartAccountingResult {
            amount: transaction.amount,
            date: transaction.date,
            category_id: transaction.category_id,
            category_name: transaction.category_name,
            transaction_type: transaction.transaction_type,
            note: transaction.note,
            account_id: book.id,
            account_name: book.name,
            account_type: book.book_type,
            budget_id: budget.as_ref().map(|b| b.id.clone()),
            budget_name: budget.as_ref().map(|b| b.name.clone()),
            budget_owner_name: budget.and_then(|b| b.owner_name),
            user_id: request.user_id.clone(),
            confidence: transaction.confidence,
            created_at: Utc::now(),
            original_description: request.description.clone(),
            debug,
        }
    }
}

fn matched(budget: &Budget) -> MatchedBudget {
    MatchedBudget {
        id: budget.id.clone(),
        name: budget.name.clone(),
        owner_name: Some(budget.display_name().to_string()),
    }
}
