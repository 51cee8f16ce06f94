use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Postgres, Row};
use std::str::FromStr;
use uuid::Uuid;

use super::{LedgerStore, LedgerWrite};
use crate::database::DatabasePool;
use crate::error::{WalletError, WalletResult};
use crate::models::{
    Autopayment, AutopaymentId, AutopaymentTarget, AutopaymentType, Bank, BankAccount,
    BankAccountId, BankId, Bill, BillId, Load, ReceiverType, Transaction, TransactionId, User,
    UserId,
};

/// Ledger store on PostgreSQL. Every method is one round trip except
/// [`LedgerStore::apply_batch`], which wraps its writes in `BEGIN … COMMIT`.
#[derive(Clone)]
pub struct PgStore {
    pool: DatabasePool,
}

impl PgStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = WalletError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: WalletError| sqlx::Error::Decode(Box::new(e)))
}

fn required<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(column)?.ok_or_else(|| {
        sqlx::Error::Decode(format!("column {} is NULL for this autopayment type", column).into())
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        phone: row.try_get("phone")?,
        cnic: row.try_get("cnic")?,
        picture: row.try_get("picture")?,
        balance: row.try_get("balance")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn bank_from_row(row: &PgRow) -> Result<Bank, sqlx::Error> {
    Ok(Bank {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        is_active: row.try_get("is_active")?,
    })
}

fn bank_account_from_row(row: &PgRow) -> Result<BankAccount, sqlx::Error> {
    Ok(BankAccount {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        bank_id: row.try_get("bank_id")?,
        account_title: row.try_get("account_title")?,
        account_number: row.try_get("account_number")?,
        iban: row.try_get("iban")?,
        balance: row.try_get("balance")?,
        is_default: row.try_get("is_default")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, sqlx::Error> {
    Ok(Transaction {
        id: row.try_get("id")?,
        sender_id: row.try_get("sender_id")?,
        receiver_id: row.try_get("receiver_id")?,
        receiver_type: parse_column(row, "receiver_type")?,
        amount: row.try_get("amount")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn bill_from_row(row: &PgRow) -> Result<Bill, sqlx::Error> {
    Ok(Bill {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        category: parse_column(row, "category")?,
        company_name: row.try_get("company_name")?,
        consumer_number: row.try_get("consumer_number")?,
        amount: row.try_get("amount")?,
        status: parse_column(row, "status")?,
        paid_at: row.try_get("paid_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn load_from_row(row: &PgRow) -> Result<Load, sqlx::Error> {
    Ok(Load {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        load_type: parse_column(row, "type")?,
        mobile_number: row.try_get("mobile_number")?,
        operator: parse_column(row, "operator")?,
        amount: row.try_get("amount")?,
        package_name: row.try_get("package_name")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn autopayment_from_row(row: &PgRow) -> Result<Autopayment, sqlx::Error> {
    let kind: AutopaymentType = parse_column(row, "type")?;
    let decode = |e: WalletError| sqlx::Error::Decode(Box::new(e));

    let target = match kind {
        AutopaymentType::Bill => AutopaymentTarget::Bill {
            bill_id: required(row, "bill_id")?,
        },
        AutopaymentType::Transfer => AutopaymentTarget::Transfer {
            receiver_id: required(row, "receiver_id")?,
            receiver_type: row
                .try_get::<Option<String>, _>("receiver_type")?
                .map(|s| s.parse::<ReceiverType>())
                .transpose()
                .map_err(decode)?
                .unwrap_or(ReceiverType::JazzCash),
        },
        AutopaymentType::Prepaid | AutopaymentType::Postpaid | AutopaymentType::Package => {
            let mobile_number: String = required(row, "mobile_number")?;
            let operator = required::<String>(row, "operator")?
                .parse()
                .map_err(decode)?;
            match kind {
                AutopaymentType::Prepaid => AutopaymentTarget::Prepaid {
                    mobile_number,
                    operator,
                },
                AutopaymentType::Postpaid => AutopaymentTarget::Postpaid {
                    mobile_number,
                    operator,
                },
                _ => AutopaymentTarget::Package {
                    mobile_number,
                    operator,
                    package_name: required(row, "package_name")?,
                },
            }
        }
    };

    Ok(Autopayment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        schedule: parse_column(row, "schedule")?,
        next_run: row.try_get("next_run")?,
        is_active: row.try_get("is_active")?,
        target,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Payload columns of the autopayments table for one target.
#[derive(Default)]
struct TargetColumns<'a> {
    bill_id: Option<Uuid>,
    receiver_id: Option<Uuid>,
    receiver_type: Option<&'static str>,
    mobile_number: Option<&'a str>,
    operator: Option<&'static str>,
    package_name: Option<&'a str>,
}

impl<'a> From<&'a AutopaymentTarget> for TargetColumns<'a> {
    fn from(target: &'a AutopaymentTarget) -> Self {
        match target {
            AutopaymentTarget::Bill { bill_id } => TargetColumns {
                bill_id: Some(*bill_id),
                ..Default::default()
            },
            AutopaymentTarget::Transfer {
                receiver_id,
                receiver_type,
            } => TargetColumns {
                receiver_id: Some(*receiver_id),
                receiver_type: Some(receiver_type.as_str()),
                ..Default::default()
            },
            AutopaymentTarget::Prepaid {
                mobile_number,
                operator,
            }
            | AutopaymentTarget::Postpaid {
                mobile_number,
                operator,
            } => TargetColumns {
                mobile_number: Some(mobile_number),
                operator: Some(operator.as_str()),
                ..Default::default()
            },
            AutopaymentTarget::Package {
                mobile_number,
                operator,
                package_name,
            } => TargetColumns {
                mobile_number: Some(mobile_number),
                operator: Some(operator.as_str()),
                package_name: Some(package_name),
                ..Default::default()
            },
        }
    }
}

fn expect_one_row(rows: u64, what: &str) -> WalletResult<()> {
    if rows == 0 {
        return Err(WalletError::Persistence(format!("{} does not exist", what)));
    }
    Ok(())
}

async fn execute_write(conn: &mut PgConnection, write: &LedgerWrite) -> WalletResult<()> {
    match write {
        LedgerWrite::InsertTransaction(tx) => {
            sqlx::query(
                r#"
                INSERT INTO transactions (id, sender_id, receiver_id, receiver_type, amount, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(tx.id)
            .bind(tx.sender_id)
            .bind(tx.receiver_id)
            .bind(tx.receiver_type.as_str())
            .bind(tx.amount)
            .bind(tx.status.as_str())
            .bind(tx.created_at)
            .bind(tx.updated_at)
            .execute(&mut *conn)
            .await?;
        }
        LedgerWrite::SetTransactionStatus { id, status, at } => {
            let result = sqlx::query("UPDATE transactions SET status = $1, updated_at = $2 WHERE id = $3")
                .bind(status.as_str())
                .bind(at)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            expect_one_row(result.rows_affected(), "transaction")?;
        }
        LedgerWrite::InsertBill(bill) => {
            sqlx::query(
                r#"
                INSERT INTO bills (id, user_id, category, company_name, consumer_number, amount, status, paid_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(bill.id)
            .bind(bill.user_id)
            .bind(bill.category.as_str())
            .bind(&bill.company_name)
            .bind(&bill.consumer_number)
            .bind(bill.amount)
            .bind(bill.status.as_str())
            .bind(bill.paid_at)
            .bind(bill.created_at)
            .bind(bill.updated_at)
            .execute(&mut *conn)
            .await?;
        }
        LedgerWrite::MarkBillPaid { id, paid_at } => {
            let result = sqlx::query(
                "UPDATE bills SET status = 'Paid', paid_at = $1, updated_at = $1 WHERE id = $2",
            )
            .bind(paid_at)
            .bind(id)
            .execute(&mut *conn)
            .await?;
            expect_one_row(result.rows_affected(), "bill")?;
        }
        LedgerWrite::InsertLoad(load) => {
            sqlx::query(
                r#"
                INSERT INTO loads (id, user_id, type, mobile_number, operator, amount, package_name, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(load.id)
            .bind(load.user_id)
            .bind(load.load_type.as_str())
            .bind(&load.mobile_number)
            .bind(load.operator.as_str())
            .bind(load.amount)
            .bind(load.package_name.as_deref())
            .bind(load.status.as_str())
            .bind(load.created_at)
            .execute(&mut *conn)
            .await?;
        }
        LedgerWrite::SetWalletBalance { user_id, balance, at } => {
            let result = sqlx::query("UPDATE users SET balance = $1, updated_at = $2 WHERE id = $3")
                .bind(balance)
                .bind(at)
                .bind(user_id)
                .execute(&mut *conn)
                .await?;
            expect_one_row(result.rows_affected(), "user")?;
        }
        LedgerWrite::SetBankAccountBalance {
            account_id,
            balance,
            at,
        } => {
            let result =
                sqlx::query("UPDATE bank_accounts SET balance = $1, updated_at = $2 WHERE id = $3")
                    .bind(balance)
                    .bind(at)
                    .bind(account_id)
                    .execute(&mut *conn)
                    .await?;
            expect_one_row(result.rows_affected(), "bank account")?;
        }
        LedgerWrite::RescheduleAutopayment { id, next_run, at } => {
            let result =
                sqlx::query("UPDATE autopayments SET next_run = $1, updated_at = $2 WHERE id = $3")
                    .bind(next_run)
                    .bind(at)
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
            expect_one_row(result.rows_affected(), "autopayment")?;
        }
    }
    Ok(())
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, phone, cnic, picture, balance, created_at, updated_at";
const BANK_ACCOUNT_COLUMNS: &str = "id, user_id, bank_id, account_title, account_number, iban, balance, is_default, is_active, created_at, updated_at";
const AUTOPAYMENT_COLUMNS: &str = "id, user_id, amount, type, schedule, next_run, is_active, bill_id, receiver_id, receiver_type, mobile_number, operator, package_name, created_at, updated_at";

impl PgStore {
    async fn find_user_where(&self, column: &str, value: &str) -> WalletResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1 LIMIT 1", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn insert_user(&self, user: &User) -> WalletResult<()> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            USER_COLUMNS
        );
        sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.phone)
            .bind(&user.cnic)
            .bind(&user.picture)
            .bind(user.balance)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => WalletError::Conflict(
                    "User already exists with this email, phone, or CNIC".to_string(),
                ),
                other => other.into(),
            })?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> WalletResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_email(&self, email: &str) -> WalletResult<Option<User>> {
        self.find_user_where("email", email).await
    }

    async fn find_user_by_phone(&self, phone: &str) -> WalletResult<Option<User>> {
        self.find_user_where("phone", phone).await
    }

    async fn find_user_by_cnic(&self, cnic: &str) -> WalletResult<Option<User>> {
        self.find_user_where("cnic", cnic).await
    }

    async fn list_users(&self) -> WalletResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&*self.pool).await?;
        Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
    }

    async fn update_profile(&self, user: &User) -> WalletResult<()> {
        let result = sqlx::query(
            "UPDATE users SET name = $1, email = $2, phone = $3, picture = $4, updated_at = $5 WHERE id = $6",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.picture)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&*self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                WalletError::Conflict("Email or phone is already in use".to_string())
            }
            other => other.into(),
        })?;
        expect_one_row(result.rows_affected(), "user")
    }

    async fn count_banks(&self) -> WalletResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM banks")
            .fetch_one(&*self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_banks(&self, banks: &[Bank]) -> WalletResult<()> {
        let mut tx = self.pool.begin().await?;
        for bank in banks {
            sqlx::query("INSERT INTO banks (id, name, code, is_active) VALUES ($1, $2, $3, $4)")
                .bind(bank.id)
                .bind(&bank.name)
                .bind(&bank.code)
                .bind(bank.is_active)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_bank(&self, id: BankId) -> WalletResult<Option<Bank>> {
        let row = sqlx::query("SELECT id, name, code, is_active FROM banks WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(bank_from_row).transpose()?)
    }

    async fn list_active_banks(&self) -> WalletResult<Vec<Bank>> {
        let rows = sqlx::query(
            "SELECT id, name, code, is_active FROM banks WHERE is_active = true ORDER BY name",
        )
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.iter().map(bank_from_row).collect::<Result<_, _>>()?)
    }

    async fn insert_bank_account(&self, account: &BankAccount) -> WalletResult<()> {
        let sql = format!(
            "INSERT INTO bank_accounts ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            BANK_ACCOUNT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(account.id)
            .bind(account.user_id)
            .bind(account.bank_id)
            .bind(&account.account_title)
            .bind(&account.account_number)
            .bind(&account.iban)
            .bind(account.balance)
            .bind(account.is_default)
            .bind(account.is_active)
            .bind(account.created_at)
            .bind(account.updated_at)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn get_bank_account(&self, id: BankAccountId) -> WalletResult<Option<BankAccount>> {
        let sql = format!("SELECT {} FROM bank_accounts WHERE id = $1", BANK_ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(bank_account_from_row).transpose()?)
    }

    async fn update_bank_account(&self, account: &BankAccount) -> WalletResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bank_accounts
            SET account_title = $1, account_number = $2, iban = $3, is_default = $4, is_active = $5, updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(&account.account_title)
        .bind(&account.account_number)
        .bind(&account.iban)
        .bind(account.is_default)
        .bind(account.is_active)
        .bind(account.updated_at)
        .bind(account.id)
        .execute(&*self.pool)
        .await?;
        expect_one_row(result.rows_affected(), "bank account")
    }

    async fn clear_default_bank_accounts(&self, user_id: UserId) -> WalletResult<()> {
        sqlx::query(
            "UPDATE bank_accounts SET is_default = false, updated_at = NOW() WHERE user_id = $1 AND is_default = true",
        )
        .bind(user_id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn count_default_bank_accounts(&self, user_id: UserId) -> WalletResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bank_accounts WHERE user_id = $1 AND is_default = true",
        )
        .bind(user_id)
        .fetch_one(&*self.pool)
        .await?;
        Ok(count)
    }

    async fn list_bank_accounts(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> WalletResult<Vec<BankAccount>> {
        let sql = format!(
            "SELECT {} FROM bank_accounts WHERE user_id = $1 AND (is_active = true OR NOT $2) ORDER BY is_default DESC, created_at DESC",
            BANK_ACCOUNT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(active_only)
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.iter().map(bank_account_from_row).collect::<Result<_, _>>()?)
    }

    async fn find_active_bank_account_by_number(
        &self,
        identifier: &str,
    ) -> WalletResult<Option<BankAccount>> {
        let sql = format!(
            "SELECT {} FROM bank_accounts WHERE is_active = true AND (account_number = $1 OR (iban <> '' AND iban = $1)) ORDER BY created_at LIMIT 1",
            BANK_ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(identifier)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(bank_account_from_row).transpose()?)
    }

    async fn find_active_bank_account_for_bank(
        &self,
        user_id: UserId,
        bank_id: BankId,
    ) -> WalletResult<Option<BankAccount>> {
        let sql = format!(
            "SELECT {} FROM bank_accounts WHERE user_id = $1 AND bank_id = $2 AND is_active = true ORDER BY is_default DESC, created_at LIMIT 1",
            BANK_ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(bank_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(bank_account_from_row).transpose()?)
    }

    async fn get_transaction(&self, id: TransactionId) -> WalletResult<Option<Transaction>> {
        let row = sqlx::query(
            "SELECT id, sender_id, receiver_id, receiver_type, amount, status, created_at, updated_at FROM transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.as_ref().map(transaction_from_row).transpose()?)
    }

    async fn list_transactions_by_sender(&self, user_id: UserId) -> WalletResult<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT id, sender_id, receiver_id, receiver_type, amount, status, created_at, updated_at FROM transactions WHERE sender_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.iter().map(transaction_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_bill(&self, id: BillId) -> WalletResult<Option<Bill>> {
        let row = sqlx::query(
            "SELECT id, user_id, category, company_name, consumer_number, amount, status, paid_at, created_at, updated_at FROM bills WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.as_ref().map(bill_from_row).transpose()?)
    }

    async fn list_bills(&self, user_id: UserId) -> WalletResult<Vec<Bill>> {
        let rows = sqlx::query(
            "SELECT id, user_id, category, company_name, consumer_number, amount, status, paid_at, created_at, updated_at FROM bills WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.iter().map(bill_from_row).collect::<Result<_, _>>()?)
    }

    async fn list_loads(&self, user_id: UserId) -> WalletResult<Vec<Load>> {
        let rows = sqlx::query(
            "SELECT id, user_id, type, mobile_number, operator, amount, package_name, status, created_at FROM loads WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.iter().map(load_from_row).collect::<Result<_, _>>()?)
    }

    async fn insert_autopayment(&self, autopayment: &Autopayment) -> WalletResult<()> {
        let columns = TargetColumns::from(&autopayment.target);
        let sql = format!(
            "INSERT INTO autopayments ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            AUTOPAYMENT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(autopayment.id)
            .bind(autopayment.user_id)
            .bind(autopayment.amount)
            .bind(autopayment.kind().as_str())
            .bind(autopayment.schedule.as_str())
            .bind(autopayment.next_run)
            .bind(autopayment.is_active)
            .bind(columns.bill_id)
            .bind(columns.receiver_id)
            .bind(columns.receiver_type)
            .bind(columns.mobile_number)
            .bind(columns.operator)
            .bind(columns.package_name)
            .bind(autopayment.created_at)
            .bind(autopayment.updated_at)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn get_autopayment(&self, id: AutopaymentId) -> WalletResult<Option<Autopayment>> {
        let sql = format!("SELECT {} FROM autopayments WHERE id = $1", AUTOPAYMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.as_ref().map(autopayment_from_row).transpose()?)
    }

    async fn list_autopayments(&self, user_id: UserId) -> WalletResult<Vec<Autopayment>> {
        let sql = format!(
            "SELECT {} FROM autopayments WHERE user_id = $1 ORDER BY created_at DESC",
            AUTOPAYMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.iter().map(autopayment_from_row).collect::<Result<_, _>>()?)
    }

    async fn due_autopayments(&self, now: DateTime<Utc>) -> WalletResult<Vec<Autopayment>> {
        let sql = format!(
            "SELECT {} FROM autopayments WHERE is_active = true AND next_run <= $1 ORDER BY next_run",
            AUTOPAYMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(now)
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.iter().map(autopayment_from_row).collect::<Result<_, _>>()?)
    }

    async fn apply(&self, write: &LedgerWrite) -> WalletResult<()> {
        let mut conn = self.pool.acquire().await?;
        execute_write(&mut conn, write).await
    }

    async fn apply_batch(&self, writes: &[LedgerWrite]) -> WalletResult<()> {
        let mut tx = self.pool.begin().await?;
        for write in writes {
            if let Err(e) = execute_write(&mut tx, write).await {
                tracing::warn!("Rolling back ledger batch at {}: {}", write.label(), e);
                tx.rollback().await?;
                return Err(e);
            }
        }
        tx.commit().await?;
        Ok(())
    }
}
