//! Integration tests for bankrec-core services
//!
//! Every scenario runs against a real DuckDB ledger in a temporary directory.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use bankrec_core::services::{CheckStatus, NewAccount, NewRecord, DEFAULT_IGNORE_REASON};
use bankrec_core::{
    BankTransaction, BankrecContext, Error, PendingFilter, RecordKind, RecordStatus,
    TransactionStatus,
};

const USER: &str = "tester";

// ============================================================================
// Test Helpers
// ============================================================================

fn create_context(temp_dir: &TempDir) -> BankrecContext {
    BankrecContext::new(temp_dir.path()).expect("Failed to create context")
}

fn create_account(ctx: &BankrecContext, initial_balance: Decimal) -> Uuid {
    ctx.account_service
        .create(NewAccount {
            bank_code: "0341".to_string(),
            branch: "1234".to_string(),
            account_number: "56789-0".to_string(),
            account_type: None,
            description: "Operating account".to_string(),
            initial_balance,
        })
        .expect("Failed to create account")
        .id
}

fn create_record(
    ctx: &BankrecContext,
    kind: RecordKind,
    cents: i64,
    due: Option<NaiveDate>,
) -> Uuid {
    ctx.record_service
        .create(NewRecord {
            kind,
            amount: Decimal::new(cents, 2),
            due_date: due,
            description: format!("{} {}", kind, cents),
            counterparty: None,
        })
        .expect("Failed to create record")
        .id
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, day).unwrap()
}

fn datetime(day: u32) -> NaiveDateTime {
    date(day).and_hms_opt(0, 0, 0).unwrap()
}

/// Build an SGML statement from (fitid, yyyymmdd, amount) lines
fn statement(lines: &[(&str, &str, &str)]) -> String {
    let mut out = String::from(
        "OFXHEADER:100\nDATA:OFXSGML\n\n<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS>\n\
         <BANKACCTFROM><BANKID>0341<BRANCHID>1234<ACCTID>56789-0</BANKACCTFROM>\n\
         <BANKTRANLIST>\n<DTSTART>20251001\n<DTEND>20251031\n",
    );
    for (fitid, posted, amount) in lines {
        let trn_type = if amount.starts_with('-') { "DEBIT" } else { "CREDIT" };
        out.push_str(&format!(
            "<STMTTRN>\n<TRNTYPE>{}\n<DTPOSTED>{}\n<TRNAMT>{}\n<FITID>{}\n<MEMO>LINE {}\n</STMTTRN>\n",
            trn_type, posted, amount, fitid, fitid
        ));
    }
    out.push_str("</BANKTRANLIST>\n<LEDGERBAL><BALAMT>5320.10\n<DTASOF>20251031\n</LEDGERBAL>\n");
    out.push_str("</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>\n");
    out
}

fn standard_statement() -> String {
    statement(&[
        ("A001", "20251008", "1000.00"),
        ("A002", "20251009", "-250.75"),
        ("A003", "20251010", "77.00"),
    ])
}

/// Pending transactions of an account, oldest first
fn pending(ctx: &BankrecContext, account_id: Uuid) -> Vec<BankTransaction> {
    ctx.status_service
        .list_pending(&PendingFilter::for_account(account_id))
        .unwrap()
}

fn transaction(ctx: &BankrecContext, id: Uuid) -> BankTransaction {
    ctx.repository.get_bank_transaction(id).unwrap().unwrap()
}

fn balance(ctx: &BankrecContext, account_id: Uuid) -> Decimal {
    ctx.account_service.get(account_id).unwrap().current_balance
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn test_clean_import_inserts_every_line() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);

    let result = ctx
        .import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();

    assert_eq!(result.total_in_file, 3);
    assert_eq!(result.inserted, 3);
    assert_eq!(result.duplicates, 0);
    assert!(result.import_id.is_some());
    assert_eq!(result.balance.amount, Some(Decimal::new(532010, 2)));

    let lines = pending(&ctx, account_id);
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|t| t.status == TransactionStatus::Pending));
    assert_eq!(lines[1].amount, Decimal::new(-25075, 2));
    assert_eq!(lines[1].posted_at, Some(datetime(9)));
    assert_eq!(lines[1].bank_ref.as_deref(), Some("A002"));
    assert_eq!(lines[1].description, "LINE A002");
}

#[test]
fn test_reimporting_same_file_inserts_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    let text = standard_statement();

    ctx.import_service.import(account_id, &text, USER).unwrap();
    let second = ctx.import_service.import(account_id, &text, USER).unwrap();

    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 3);
    assert_eq!(ctx.repository.count_bank_transactions(account_id).unwrap(), 3);
    // Both imports are still recorded
    assert_eq!(ctx.import_service.list_imports(Some(account_id)).unwrap().len(), 2);
}

#[test]
fn test_overlapping_statement_inserts_only_new_lines() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);

    ctx.import_service
        .import(account_id, &statement(&[("A001", "20251008", "1000.00")]), USER)
        .unwrap();
    let result = ctx
        .import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();

    assert_eq!(result.inserted, 2);
    assert_eq!(result.duplicates, 1);
    assert_eq!(ctx.repository.count_bank_transactions(account_id).unwrap(), 3);
}

#[test]
fn test_same_fitid_on_another_account_is_not_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let first = create_account(&ctx, Decimal::ZERO);
    let second = create_account(&ctx, Decimal::ZERO);
    let text = standard_statement();

    ctx.import_service.import(first, &text, USER).unwrap();
    let result = ctx.import_service.import(second, &text, USER).unwrap();

    assert_eq!(result.inserted, 3);
    assert_eq!(result.duplicates, 0);
}

#[test]
fn test_import_without_transactions_fails() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);

    let err = ctx
        .import_service
        .import(account_id, &statement(&[]), USER)
        .unwrap_err();
    assert!(matches!(err, Error::EmptyStatement));
    assert!(ctx.import_service.list_imports(None).unwrap().is_empty());
}

#[test]
fn test_import_into_unknown_account_fails() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let missing = Uuid::new_v4();

    let err = ctx
        .import_service
        .import(missing, &standard_statement(), USER)
        .unwrap_err();
    assert!(matches!(err, Error::AccountNotFound(id) if id == missing));
}

#[test]
fn test_preview_reports_duplicates_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);

    ctx.import_service
        .import(account_id, &statement(&[("A001", "20251008", "1000.00")]), USER)
        .unwrap();

    let text = standard_statement();
    let preview = ctx
        .import_service
        .import_bytes(account_id, "october.ofx", text.as_bytes(), USER, true)
        .unwrap();

    assert!(preview.preview);
    assert!(preview.import_id.is_none());
    assert_eq!(preview.inserted, 2);
    assert_eq!(preview.duplicates, 1);
    let lines = preview.lines.unwrap();
    assert!(lines[0].duplicate);
    assert!(!lines[1].duplicate);

    assert_eq!(ctx.repository.count_bank_transactions(account_id).unwrap(), 1);
    assert_eq!(ctx.import_service.list_imports(Some(account_id)).unwrap().len(), 1);
}

#[test]
fn test_import_file_keeps_filename_and_decodes_latin1() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);

    // Latin-1 "É" is the single byte 0xC9
    let text = statement(&[("L1", "20251008", "10.00")]).replace("LINE L1", "PIX JOS#");
    let bytes: Vec<u8> = text
        .into_bytes()
        .into_iter()
        .map(|b| if b == b'#' { 0xC9 } else { b })
        .collect();

    let path = temp_dir.path().join("extrato.ofx");
    std::fs::write(&path, &bytes).unwrap();

    let result = ctx
        .import_service
        .import_file(account_id, &path, USER, false)
        .unwrap();
    assert_eq!(result.inserted, 1);

    let imports = ctx.import_service.list_imports(Some(account_id)).unwrap();
    assert_eq!(imports[0].filename, "extrato.ofx");
    assert_eq!(imports[0].imported_by, USER);
    assert_eq!(imports[0].bank_code, "0341");
    assert_eq!(imports[0].file_digest.len(), 16);

    assert_eq!(pending(&ctx, account_id)[0].description, "PIX JOSÉ");
}

#[test]
fn test_out_of_range_amount_imports_as_zero() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    let text = statement(&[
        ("B001", "20251008", "10.00"),
        ("B002", "20251009", "99999999999999999999.00"),
        ("B003", "20251010", "5.00"),
    ]);

    let result = ctx.import_service.import(account_id, &text, USER).unwrap();
    assert_eq!(result.inserted, 3);
    assert_eq!(result.duplicates, 0);

    let lines = pending(&ctx, account_id);
    let amounts: Vec<Decimal> = lines.iter().map(|t| t.amount).collect();
    assert_eq!(
        amounts,
        vec![Decimal::new(1000, 2), Decimal::ZERO, Decimal::new(500, 2)]
    );

    // A retry is an ordinary re-import
    let again = ctx.import_service.import(account_id, &text, USER).unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 3);
    assert_eq!(ctx.import_service.list_imports(Some(account_id)).unwrap().len(), 2);
}

#[test]
fn test_sub_cent_amounts_are_rounded_to_cents() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    let text = statement(&[
        ("C001", "20251008", "10.005"),
        ("C002", "20251009", "-3.333"),
    ]);

    let result = ctx.import_service.import(account_id, &text, USER).unwrap();
    assert_eq!(result.inserted, 2);

    let lines = pending(&ctx, account_id);
    assert_eq!(lines[0].amount, Decimal::new(1001, 2));
    assert_eq!(lines[1].amount, Decimal::new(-333, 2));
}

#[test]
fn test_text_and_file_imports_share_digest() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let from_file = create_account(&ctx, Decimal::ZERO);
    let from_text = create_account(&ctx, Decimal::ZERO);

    let text = statement(&[("D1", "20251008", "10.00")]).replace("LINE D1", "PIX JOS#");
    let bytes: Vec<u8> = text
        .into_bytes()
        .into_iter()
        .map(|b| if b == b'#' { 0xC9 } else { b })
        .collect();

    ctx.import_service
        .import_bytes(from_file, "extrato.ofx", &bytes, USER, false)
        .unwrap();
    let decoded = pending(&ctx, from_file)[0].description.clone();
    assert_eq!(decoded, "PIX JOSÉ");

    let decoded_text: String = bytes.iter().map(|&b| b as char).collect();
    ctx.import_service
        .import(from_text, &decoded_text, USER)
        .unwrap();

    let file_digest = &ctx.import_service.list_imports(Some(from_file)).unwrap()[0].file_digest;
    let text_digest = &ctx.import_service.list_imports(Some(from_text)).unwrap()[0].file_digest;
    assert_eq!(file_digest, text_digest);
}

// ============================================================================
// Match suggestion
// ============================================================================

#[test]
fn test_suggest_ranks_nearest_amounts_first() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &statement(&[("A001", "20251008", "1000.00")]), USER)
        .unwrap();
    let tx_id = pending(&ctx, account_id)[0].id;

    let r995 = create_record(&ctx, RecordKind::Receivable, 99500, Some(date(8)));
    let r1005 = create_record(&ctx, RecordKind::Receivable, 100500, Some(date(8)));
    create_record(&ctx, RecordKind::Receivable, 110000, Some(date(8)));
    create_record(&ctx, RecordKind::Payable, 100000, Some(date(8)));

    let suggestion = ctx.match_service.suggest(tx_id).unwrap();
    assert_eq!(suggestion.record_kind, Some(RecordKind::Receivable));

    let ids: Vec<Uuid> = suggestion.candidates.iter().map(|c| c.record.id).collect();
    assert_eq!(ids, vec![r995, r1005]);
    assert_eq!(suggestion.candidates[0].similarity, Decimal::new(995, 1));
    assert_eq!(suggestion.candidates[0].day_distance, Some(0));
}

#[test]
fn test_suggest_tolerance_bounds_are_inclusive() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &statement(&[("A002", "20251009", "-1000.00")]), USER)
        .unwrap();
    let tx_id = pending(&ctx, account_id)[0].id;

    let low = create_record(&ctx, RecordKind::Payable, 99000, None);
    let high = create_record(&ctx, RecordKind::Payable, 101000, None);
    create_record(&ctx, RecordKind::Payable, 98990, None);
    create_record(&ctx, RecordKind::Payable, 101010, None);

    let suggestion = ctx.match_service.suggest(tx_id).unwrap();
    assert_eq!(suggestion.record_kind, Some(RecordKind::Payable));

    let mut ids: Vec<Uuid> = suggestion.candidates.iter().map(|c| c.record.id).collect();
    ids.sort();
    let mut expected = vec![low, high];
    expected.sort();
    assert_eq!(ids, expected);
    assert!(suggestion
        .candidates
        .iter()
        .all(|c| c.similarity == Decimal::new(99, 0)));
}

#[test]
fn test_suggest_skips_processed_records_and_transactions() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let lines = pending(&ctx, account_id);

    let small = create_record(&ctx, RecordKind::Receivable, 7700, None);
    let r1000 = create_record(&ctx, RecordKind::Receivable, 100000, Some(date(8)));
    ctx.reconcile_service
        .reconcile(lines[2].id, RecordKind::Receivable, r1000, USER)
        .unwrap();

    // The paid record is no longer offered
    let credit = ctx.match_service.suggest(lines[0].id).unwrap();
    assert!(credit.candidates.is_empty());

    // A reconciled transaction gets no candidates even when one would fit
    let done = ctx.match_service.suggest(lines[2].id).unwrap();
    assert_eq!(done.transaction.status, TransactionStatus::Reconciled);
    assert!(done.candidates.is_empty());
    assert!(ctx.record_service.get(RecordKind::Receivable, small).unwrap().is_open());
}

#[test]
fn test_suggest_handles_large_amounts() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(
            account_id,
            &statement(&[("E001", "20251008", "2000000000000.00")]),
            USER,
        )
        .unwrap();
    let tx_id = pending(&ctx, account_id)[0].id;
    let record = create_record(&ctx, RecordKind::Receivable, 200_000_000_000_000, Some(date(8)));

    let suggestion = ctx.match_service.suggest(tx_id).unwrap();
    assert_eq!(suggestion.candidates.len(), 1);
    assert_eq!(suggestion.candidates[0].record.id, record);
    assert_eq!(suggestion.candidates[0].similarity, Decimal::ONE_HUNDRED);
}

#[test]
fn test_suggest_unknown_transaction_fails() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let err = ctx.match_service.suggest(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, Error::TransactionNotFound(_)));
}

// ============================================================================
// Reconcile and ignore
// ============================================================================

#[test]
fn test_reconcile_updates_all_three_rows() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::new(100000, 2));
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let debit = pending(&ctx, account_id)[1].clone();

    let record_id = create_record(&ctx, RecordKind::Payable, 25000, Some(date(10)));
    let outcome = ctx
        .reconcile_service
        .reconcile(debit.id, RecordKind::Payable, record_id, USER)
        .unwrap();

    assert_eq!(outcome.amount, Decimal::new(-25075, 2));
    assert_eq!(outcome.paid_date, date(9));

    let record = ctx.record_service.get(RecordKind::Payable, record_id).unwrap();
    assert_eq!(record.status, RecordStatus::Paid);
    assert_eq!(record.paid_date, Some(date(9)));
    // Paid amount is what the bank moved, not what was expected
    assert_eq!(record.paid_amount, Some(Decimal::new(25075, 2)));

    let tx = transaction(&ctx, debit.id);
    assert_eq!(tx.status, TransactionStatus::Reconciled);
    assert_eq!(tx.matched_kind, Some(RecordKind::Payable));
    assert_eq!(tx.matched_id, Some(record_id));
    assert_eq!(tx.processed_by.as_deref(), Some(USER));
    assert!(tx.processed_at.is_some());

    assert_eq!(balance(&ctx, account_id), Decimal::new(74925, 2));
}

#[test]
fn test_second_reconcile_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let credit = pending(&ctx, account_id)[0].id;

    let first = create_record(&ctx, RecordKind::Receivable, 100000, None);
    let second = create_record(&ctx, RecordKind::Receivable, 100000, None);
    ctx.reconcile_service
        .reconcile(credit, RecordKind::Receivable, first, USER)
        .unwrap();

    let err = ctx
        .reconcile_service
        .reconcile(credit, RecordKind::Receivable, second, USER)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::AlreadyProcessed {
            status: TransactionStatus::Reconciled,
            ..
        }
    ));

    // The balance moved once and the second record is untouched
    assert_eq!(balance(&ctx, account_id), Decimal::new(100000, 2));
    assert!(ctx.record_service.get(RecordKind::Receivable, second).unwrap().is_open());
}

#[test]
fn test_paid_record_cannot_settle_another_transaction() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let lines = pending(&ctx, account_id);

    let record = create_record(&ctx, RecordKind::Receivable, 100000, None);
    ctx.reconcile_service
        .reconcile(lines[0].id, RecordKind::Receivable, record, USER)
        .unwrap();

    let err = ctx
        .reconcile_service
        .reconcile(lines[2].id, RecordKind::Receivable, record, USER)
        .unwrap_err();
    assert!(matches!(err, Error::RecordNotOpen { .. }));
    assert!(transaction(&ctx, lines[2].id).is_pending());
    assert_eq!(balance(&ctx, account_id), Decimal::new(100000, 2));
}

#[test]
fn test_reconcile_missing_rows() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let credit = pending(&ctx, account_id)[0].id;
    let record = create_record(&ctx, RecordKind::Receivable, 100000, None);

    let err = ctx
        .reconcile_service
        .reconcile(Uuid::new_v4(), RecordKind::Receivable, record, USER)
        .unwrap_err();
    assert!(matches!(err, Error::TransactionNotFound(_)));

    let err = ctx
        .reconcile_service
        .reconcile(credit, RecordKind::Receivable, Uuid::new_v4(), USER)
        .unwrap_err();
    assert!(matches!(err, Error::RecordNotFound { .. }));

    // Right id, wrong kind
    let err = ctx
        .reconcile_service
        .reconcile(credit, RecordKind::Payable, record, USER)
        .unwrap_err();
    assert!(matches!(err, Error::RecordNotFound { .. }));

    assert!(transaction(&ctx, credit).is_pending());
}

/// A failure after the record was marked paid must leave nothing behind
#[test]
fn test_failed_reconcile_rolls_back_record() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    // Transaction whose account row does not exist
    let mut orphan = BankTransaction::new(
        Uuid::new_v4(),
        Decimal::new(50000, 2),
        Some(datetime(12)),
    );
    orphan.bank_ref = Some("ORPHAN".to_string());
    assert!(ctx.repository.insert_bank_transaction_if_absent(&orphan).unwrap());

    let record = create_record(&ctx, RecordKind::Receivable, 50000, None);
    let err = ctx
        .reconcile_service
        .reconcile(orphan.id, RecordKind::Receivable, record, USER)
        .unwrap_err();
    assert!(matches!(err, Error::AccountNotFound(id) if id == orphan.account_id));

    let record = ctx.record_service.get(RecordKind::Receivable, record).unwrap();
    assert_eq!(record.status, RecordStatus::Open);
    assert!(record.paid_date.is_none());
    assert!(record.paid_amount.is_none());

    let tx = transaction(&ctx, orphan.id);
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(tx.matched_id.is_none());
}

#[test]
fn test_ignore_uses_default_reason() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::new(1000, 0));
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let lines = pending(&ctx, account_id);

    let outcome = ctx.reconcile_service.ignore(lines[0].id, "   ", USER).unwrap();
    assert_eq!(outcome.reason, DEFAULT_IGNORE_REASON);
    ctx.reconcile_service
        .ignore(lines[1].id, "bank fee reversal", USER)
        .unwrap();

    let first = transaction(&ctx, lines[0].id);
    assert_eq!(first.status, TransactionStatus::Ignored);
    assert_eq!(first.observation.as_deref(), Some(DEFAULT_IGNORE_REASON));
    assert!(first.matched_id.is_none());
    assert_eq!(
        transaction(&ctx, lines[1].id).observation.as_deref(),
        Some("bank fee reversal")
    );

    // Ignoring never moves the balance
    assert_eq!(balance(&ctx, account_id), Decimal::new(1000, 0));

    let err = ctx.reconcile_service.ignore(lines[0].id, "", USER).unwrap_err();
    assert!(matches!(
        err,
        Error::AlreadyProcessed {
            status: TransactionStatus::Ignored,
            ..
        }
    ));

    let record = create_record(&ctx, RecordKind::Receivable, 100000, None);
    let err = ctx
        .reconcile_service
        .reconcile(lines[0].id, RecordKind::Receivable, record, USER)
        .unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn test_balance_tracks_reconciled_transactions() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::new(50000, 2));
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let lines = pending(&ctx, account_id);

    let receivable = create_record(&ctx, RecordKind::Receivable, 100000, None);
    let payable = create_record(&ctx, RecordKind::Payable, 25075, None);
    let small = create_record(&ctx, RecordKind::Receivable, 7700, None);
    ctx.reconcile_service
        .reconcile(lines[0].id, RecordKind::Receivable, receivable, USER)
        .unwrap();
    ctx.reconcile_service
        .reconcile(lines[1].id, RecordKind::Payable, payable, USER)
        .unwrap();
    ctx.reconcile_service
        .reconcile(lines[2].id, RecordKind::Receivable, small, USER)
        .unwrap();

    // 500.00 + 1000.00 - 250.75 + 77.00
    assert_eq!(balance(&ctx, account_id), Decimal::new(132625, 2));

    let overviews = ctx.account_service.list().unwrap();
    assert_eq!(overviews.len(), 1);
    assert!(overviews[0].is_consistent());
    assert_eq!(overviews[0].computed_balance, Decimal::new(132625, 2));
    assert_eq!(overviews[0].pending_count, 0);
}

// ============================================================================
// Listings and summary
// ============================================================================

#[test]
fn test_pending_filter_by_date_range() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    let other = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    ctx.import_service
        .import(other, &statement(&[("B001", "20251009", "5.00")]), USER)
        .unwrap();

    let filter = PendingFilter {
        account_id: Some(account_id),
        from: Some(date(9)),
        to: Some(date(10)),
    };
    let lines = ctx.status_service.list_pending(&filter).unwrap();
    let refs: Vec<_> = lines.iter().filter_map(|t| t.bank_ref.as_deref()).collect();
    assert_eq!(refs, vec!["A002", "A003"]);

    let everything = ctx.status_service.list_pending(&PendingFilter::default()).unwrap();
    assert_eq!(everything.len(), 4);
}

#[test]
fn test_summary_counts_and_pending_totals() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let account_id = create_account(&ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let lines = pending(&ctx, account_id);

    let record = create_record(&ctx, RecordKind::Receivable, 100000, None);
    ctx.reconcile_service
        .reconcile(lines[0].id, RecordKind::Receivable, record, USER)
        .unwrap();
    ctx.reconcile_service.ignore(lines[2].id, "", USER).unwrap();

    let summary = ctx.status_service.summary(Some(account_id)).unwrap();
    assert_eq!(summary.account_id, Some(account_id));
    assert_eq!(summary.total, 3);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.reconciled, 1);
    assert_eq!(summary.ignored, 1);
    assert_eq!(summary.pending_credits, Decimal::ZERO);
    assert_eq!(summary.pending_debits, Decimal::new(25075, 2));

    let empty = ctx.status_service.summary(Some(Uuid::new_v4())).unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.pending_debits, Decimal::ZERO);
}

// ============================================================================
// Auto-reconcile
// ============================================================================

fn auto_fixture(ctx: &BankrecContext) -> (Uuid, Vec<BankTransaction>, Uuid, Uuid) {
    let account_id = create_account(ctx, Decimal::ZERO);
    ctx.import_service
        .import(account_id, &standard_statement(), USER)
        .unwrap();
    let lines = pending(ctx, account_id);
    let exact = create_record(ctx, RecordKind::Receivable, 100000, Some(date(8)));
    let near = create_record(ctx, RecordKind::Payable, 25075, Some(date(11)));
    // Same amount as A003 but too far away
    create_record(ctx, RecordKind::Receivable, 7700, Some(date(25)));
    (account_id, lines, exact, near)
}

#[test]
fn test_auto_reconcile_dry_run_changes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let (account_id, lines, exact, near) = auto_fixture(&ctx);

    let result = ctx
        .reconcile_service
        .auto_reconcile(account_id, USER, true)
        .unwrap();

    assert!(result.dry_run);
    assert_eq!(result.examined, 3);
    assert_eq!(result.reconciled, 0);
    let pairs: Vec<(Uuid, Uuid)> = result
        .matches
        .iter()
        .map(|m| (m.transaction_id, m.record_id))
        .collect();
    assert_eq!(pairs, vec![(lines[0].id, exact), (lines[1].id, near)]);
    assert_eq!(result.matches[1].day_distance, 2);

    assert_eq!(pending(&ctx, account_id).len(), 3);
    assert!(ctx.record_service.get(RecordKind::Receivable, exact).unwrap().is_open());
}

#[test]
fn test_auto_reconcile_commits_every_planned_pair() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let (account_id, lines, exact, near) = auto_fixture(&ctx);

    let result = ctx
        .reconcile_service
        .auto_reconcile(account_id, USER, false)
        .unwrap();

    assert_eq!(result.reconciled, 2);
    assert!(result.failures.is_empty());
    assert_eq!(transaction(&ctx, lines[0].id).matched_id, Some(exact));
    assert_eq!(transaction(&ctx, lines[1].id).matched_id, Some(near));
    assert!(transaction(&ctx, lines[2].id).is_pending());
    assert_eq!(balance(&ctx, account_id), Decimal::new(74925, 2));

    // Nothing left to pair
    let again = ctx
        .reconcile_service
        .auto_reconcile(account_id, USER, false)
        .unwrap();
    assert_eq!(again.examined, 1);
    assert!(again.matches.is_empty());
}

#[test]
fn test_auto_reconcile_unknown_account_fails() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let err = ctx
        .reconcile_service
        .auto_reconcile(Uuid::new_v4(), USER, true)
        .unwrap_err();
    assert!(matches!(err, Error::AccountNotFound(_)));
}

// ============================================================================
// Doctor
// ============================================================================

#[test]
fn test_doctor_healthy_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let (account_id, _, _, _) = auto_fixture(&ctx);
    ctx.reconcile_service
        .auto_reconcile(account_id, USER, false)
        .unwrap();

    let result = ctx.doctor_service.run_checks().unwrap();
    assert!(result.is_healthy());
    assert_eq!(result.checks["balance_invariant"].status, CheckStatus::Pass);
    assert_eq!(result.checks["reconciled_matches"].status, CheckStatus::Pass);
    // A003 is still pending
    assert_eq!(result.checks["pending_backlog"].status, CheckStatus::Warning);
    assert_eq!(result.summary.warnings, 1);
}

#[test]
fn test_doctor_flags_orphaned_transactions() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    create_account(&ctx, Decimal::ZERO);

    let orphan = BankTransaction::new(Uuid::new_v4(), Decimal::new(100, 2), None);
    ctx.repository.insert_bank_transaction_if_absent(&orphan).unwrap();

    let result = ctx.doctor_service.run_checks().unwrap();
    assert!(!result.is_healthy());
    let check = &result.checks["orphaned_transactions"];
    assert_eq!(check.status, CheckStatus::Error);
    assert_eq!(check.details.as_ref().unwrap().len(), 1);
}

#[test]
fn test_context_reopens_existing_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let account_id = {
        let ctx = create_context(&temp_dir);
        let id = create_account(&ctx, Decimal::new(1234, 2));
        ctx.import_service
            .import(id, &standard_statement(), USER)
            .unwrap();
        id
    };

    let ctx = create_context(&temp_dir);
    assert_eq!(balance(&ctx, account_id), Decimal::new(1234, 2));
    assert_eq!(pending(&ctx, account_id).len(), 3);
}
