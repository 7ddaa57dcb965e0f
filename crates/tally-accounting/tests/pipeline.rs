//! End-to-end pipeline behavior with a scripted generator and in-memory data

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

use tally_accounting::{
    AccountingError, MemoryDirectory, PipelineOptions, SmartAccounting, SmartAccountingRequest,
    TextGenerator,
};
use tally_llm::{CompletionResponse, LlmRequestResult, Message};
use tally_types::{
    AccountBook, AccountBookType, Budget, BudgetKind, Category, FamilyMember, TransactionType,
};

/// Generator that replies from a fixed script and counts invocations
struct ScriptedGenerator {
    calls: AtomicUsize,
    reply: Mutex<LlmRequestResult>,
}

impl ScriptedGenerator {
    fn replying(content: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply: Mutex::new(LlmRequestResult::success(
                CompletionResponse {
                    content: content.to_string(),
                    usage: None,
                    model: Some("scripted".to_string()),
                },
                "scripted-provider",
                3,
            )),
        })
    }

    fn failing(error: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply: Mutex::new(LlmRequestResult::failure(error, 3)),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _messages: &[Message]) -> LlmRequestResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().unwrap().clone()
    }
}

fn category(id: &str, name: &str) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        transaction_type: TransactionType::Expense,
        is_default: true,
        user_id: None,
        account_book_id: None,
    }
}

fn window() -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    (today - ChronoDuration::days(60), today + ChronoDuration::days(60))
}

/// A personal account book for u1 with the standard category fixtures
fn directory() -> MemoryDirectory {
    MemoryDirectory::new()
        .with_category(category("3", "日用"))
        .with_category(category("9", "其他"))
        .with_book(AccountBook {
            id: "book-1".to_string(),
            name: "我的账本".to_string(),
            book_type: AccountBookType::Personal,
            user_id: "u1".to_string(),
            family_id: None,
        })
}

fn pipeline_with(
    directory: MemoryDirectory,
    generator: Arc<ScriptedGenerator>,
) -> SmartAccounting {
    let directory = Arc::new(directory);
    SmartAccounting::new(
        generator,
        directory.clone(),
        directory.clone(),
        directory,
    )
}

fn request(description: &str) -> SmartAccountingRequest {
    SmartAccountingRequest::new(description, "u1", "book-1", AccountBookType::Personal)
}

#[tokio::test]
async fn test_end_to_end_walmart_groceries() {
    let yesterday = Utc::now().date_naive() - ChronoDuration::days(1);
    let generator = ScriptedGenerator::replying(&format!(
        "根据描述，提取结果如下：\n{{\"amount\": 128.5, \"date\": \"{}\", \"categoryId\": \"3\", \
         \"categoryName\": \"日用\", \"type\": \"EXPENSE\", \"note\": \"沃尔玛日用品\", \
         \"confidence\": 0.95}}",
        yesterday.format("%Y-%m-%d")
    ));
    let pipeline = pipeline_with(directory(), generator);

    let result = pipeline
        .process_description(&request("昨天在沃尔玛买了日用品，花了128.5元"))
        .await
        .unwrap();

    assert_eq!(result.amount, 128.5);
    assert_eq!(result.category_id, "3");
    assert_eq!(result.category_name, "日用");
    assert_eq!(result.date, yesterday);
    assert_eq!(result.transaction_type, TransactionType::Expense);
    assert_eq!(result.account_name, "我的账本");
    assert_eq!(result.account_type, AccountBookType::Personal);
    assert!(result.confidence > 0.9);
    assert!(result.debug.is_none());
}

#[tokio::test]
async fn test_cache_short_circuits_the_llm_call() {
    let generator = ScriptedGenerator::replying(
        "{\"amount\": 30.0, \"categoryId\": \"3\", \"type\": \"EXPENSE\", \"confidence\": 0.9}",
    );
    let pipeline = pipeline_with(directory(), generator.clone());
    let req = request("买了洗衣液30元");

    let first = pipeline.process_description(&req).await.unwrap();
    let second = pipeline.process_description(&req).await.unwrap();

    assert_eq!(first, second);
    // Exactly one outbound call for two identical requests.
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_distinct_descriptions_do_not_share_cache_entries() {
    let generator = ScriptedGenerator::replying(
        "{\"amount\": 30.0, \"categoryId\": \"3\", \"type\": \"EXPENSE\"}",
    );
    let pipeline = pipeline_with(directory(), generator.clone());

    pipeline.process_description(&request("买了洗衣液30元")).await.unwrap();
    pipeline.process_description(&request("买了牙膏15元")).await.unwrap();

    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_unknown_category_falls_back_to_default() {
    let generator = ScriptedGenerator::replying(
        "{\"amount\": 50.0, \"categoryId\": \"999\", \"type\": \"EXPENSE\", \"confidence\": 0.9}",
    );
    let pipeline = pipeline_with(directory(), generator);

    let result = pipeline.process_description(&request("花了50元")).await.unwrap();

    assert_eq!(result.category_name, "其他");
    assert_eq!(result.confidence, 0.5);
    assert_eq!(result.amount, 0.0);
    assert_eq!(result.note, "花了50元");
}

#[tokio::test]
async fn test_non_json_output_falls_back_to_default() {
    let generator = ScriptedGenerator::replying("抱歉，我不明白你的意思。");
    let pipeline = pipeline_with(directory(), generator);

    let result = pipeline.process_description(&request("随便说点什么")).await.unwrap();

    assert_eq!(result.category_name, "其他");
    assert_eq!(result.confidence, 0.5);
    assert_eq!(result.date, Utc::now().date_naive());
}

#[tokio::test]
async fn test_generation_failure_degrades_instead_of_erroring() {
    let generator = ScriptedGenerator::failing("no providers available");
    let pipeline = pipeline_with(directory(), generator);

    let result = pipeline.process_description(&request("买菜花了20元")).await.unwrap();

    assert_eq!(result.category_name, "其他");
    assert_eq!(result.confidence, 0.5);
}

#[tokio::test]
async fn test_budget_hint_fuzzy_matches_member_name() {
    let (start, end) = window();
    let fixture = directory().with_budget(Budget {
        id: "b-zs".to_string(),
        name: "个人预算".to_string(),
        kind: BudgetKind::Personal,
        category_id: None,
        user_id: Some("u2".to_string()),
        account_book_id: Some("book-1".to_string()),
        family_id: None,
        member_name: Some("张三".to_string()),
        start_date: start,
        end_date: end,
    });
    let generator = ScriptedGenerator::replying(
        "{\"amount\": 88.0, \"categoryId\": \"3\", \"type\": \"EXPENSE\", \
         \"budgetName\": \"给张三买的\", \"confidence\": 0.9}",
    );
    let pipeline = pipeline_with(fixture, generator);

    let result = pipeline
        .process_description(&request("给张三买的日用品88元"))
        .await
        .unwrap();

    assert_eq!(result.budget_id.as_deref(), Some("b-zs"));
    assert_eq!(result.budget_owner_name.as_deref(), Some("张三"));
}

#[tokio::test]
async fn test_precedence_picks_own_budget_without_hint() {
    let (start, end) = window();
    let fixture = directory()
        .with_budget(Budget {
            id: "b-own".to_string(),
            name: "我的预算".to_string(),
            kind: BudgetKind::Personal,
            category_id: None,
            user_id: Some("u1".to_string()),
            account_book_id: Some("book-1".to_string()),
            family_id: None,
            member_name: Some("本人".to_string()),
            start_date: start,
            end_date: end,
        })
        .with_budget(Budget {
            id: "b-acc".to_string(),
            name: "账本预算".to_string(),
            kind: BudgetKind::General,
            category_id: Some("3".to_string()),
            user_id: None,
            account_book_id: Some("book-1".to_string()),
            family_id: None,
            member_name: None,
            start_date: start,
            end_date: end,
        });
    let generator = ScriptedGenerator::replying(
        "{\"amount\": 12.0, \"categoryId\": \"3\", \"type\": \"EXPENSE\", \"confidence\": 0.9}",
    );
    let pipeline = pipeline_with(fixture, generator);

    let result = pipeline.process_description(&request("买了垃圾袋12元")).await.unwrap();

    assert_eq!(result.budget_id.as_deref(), Some("b-own"));
}

#[tokio::test]
async fn test_inaccessible_account_is_fatal() {
    let fixture = directory().with_book(AccountBook {
        id: "book-2".to_string(),
        name: "别人的账本".to_string(),
        book_type: AccountBookType::Personal,
        user_id: "u2".to_string(),
        family_id: None,
    });
    let generator = ScriptedGenerator::replying(
        "{\"amount\": 5.0, \"categoryId\": \"3\", \"type\": \"EXPENSE\"}",
    );
    let pipeline = pipeline_with(fixture, generator);

    let mut req = request("买了口香糖5元");
    req.account_id = "book-2".to_string();
    let err = pipeline.process_description(&req).await.unwrap_err();

    assert!(matches!(err, AccountingError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_family_member_may_post_and_record_type_wins() {
    let fixture = MemoryDirectory::new()
        .with_category(category("3", "日用"))
        .with_book(AccountBook {
            id: "book-f".to_string(),
            name: "家庭账本".to_string(),
            book_type: AccountBookType::Family,
            user_id: "owner".to_string(),
            family_id: Some("f1".to_string()),
        })
        .with_member(
            "f1",
            FamilyMember {
                user_id: "u1".to_string(),
                name: "张三".to_string(),
            },
        );
    let generator = ScriptedGenerator::replying(
        "{\"amount\": 9.9, \"categoryId\": \"3\", \"type\": \"EXPENSE\"}",
    );
    let pipeline = pipeline_with(fixture, generator);

    // The caller claims "personal"; the persisted record says family.
    let mut req = request("买了抽纸9.9元");
    req.account_id = "book-f".to_string();
    let result = pipeline.process_description(&req).await.unwrap();

    assert_eq!(result.account_type, AccountBookType::Family);
    assert_eq!(result.account_name, "家庭账本");
}

#[tokio::test]
async fn test_debug_trace_only_on_request() {
    let reply = "{\"amount\": 1.0, \"categoryId\": \"3\", \"type\": \"EXPENSE\"}";
    let generator = ScriptedGenerator::replying(reply);
    let pipeline = pipeline_with(directory(), generator);

    let plain = pipeline.process_description(&request("买了袋盐1元")).await.unwrap();
    assert!(plain.debug.is_none());

    let traced = pipeline
        .process_description(&request("又买了袋盐1元").with_debug())
        .await
        .unwrap();
    let debug = traced.debug.unwrap();
    assert_eq!(debug.raw_response, reply);
    assert!(debug.system_prompt.contains("3:日用(支出)"));
    assert!(debug.user_prompt.contains("又买了袋盐1元"));
}

#[tokio::test]
async fn test_debug_always_option() {
    let generator = ScriptedGenerator::replying(
        "{\"amount\": 1.0, \"categoryId\": \"3\", \"type\": \"EXPENSE\"}",
    );
    let pipeline = pipeline_with(directory(), generator).with_options(PipelineOptions {
        debug_always: true,
        ..PipelineOptions::default()
    });

    let result = pipeline.process_description(&request("买了袋盐1元")).await.unwrap();
    assert!(result.debug.is_some());
}

#[tokio::test]
async fn test_empty_ids_are_rejected() {
    let generator = ScriptedGenerator::replying("{}");
    let pipeline = pipeline_with(directory(), generator);

    let mut missing_user = request("买了点东西");
    missing_user.user_id = String::new();
    assert!(matches!(
        pipeline.process_description(&missing_user).await.unwrap_err(),
        AccountingError::InvalidRequest { field: "userId" }
    ));

    let mut missing_account = request("买了点东西");
    missing_account.account_id = String::new();
    assert!(matches!(
        pipeline.process_description(&missing_account).await.unwrap_err(),
        AccountingError::InvalidRequest { field: "accountId" }
    ));
}
