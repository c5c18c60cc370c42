//! PostgreSQL connection implementation

use async_trait::async_trait;
use bytes::BytesMut;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_postgres::{
    Client, NoTls, Row as PgRow,
    types::{FromSql, ToSql, Type},
};
use vbatch_core::{
    ColumnMeta, Connection, LiteralDialect, QueryResult, Result, Row, StatementResult,
    Transaction, Value, VbatchError,
};

use crate::{PostgresLiterals, TlsSettings};

static POSTGRES_LITERALS: PostgresLiterals = PostgresLiterals;

pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let code = db_error.code();
    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail()
        && !detail.trim().is_empty()
    {
        message.push_str(&format!(" (detail: {})", detail));
    }

    if let Some(hint) = db_error.hint()
        && !hint.trim().is_empty()
    {
        message.push_str(&format!(" (hint: {})", hint));
    }

    if let Some(column) = db_error.column()
        && !column.trim().is_empty()
    {
        message.push_str(&format!(" (column: {})", column));
    }

    match code.code() {
        "23505" => format!("duplicate value violates unique constraint: {}", message),
        "23503" => format!("foreign key violation: {}", message),
        "23502" => format!("null value violates not-null constraint: {}", message),
        "22007" => format!("invalid datetime format: {}", message),
        "22P02" => format!("invalid input syntax: {}", message),
        "42601" => format!("syntax error: {}", message),
        _ => format!("{} (code: {})", message, code.code()),
    }
}

fn query_error(context: &str, error: &tokio_postgres::Error) -> VbatchError {
    VbatchError::Query(format!("{}: {}", context, format_postgres_error(error)))
}

/// PostgreSQL connection wrapper
pub struct PostgresConnection {
    client: Arc<Mutex<Client>>,
    closed: Arc<AtomicBool>,
    io_task: JoinHandle<()>,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database.
    ///
    /// The connection I/O runs on a task spawned onto the current tokio runtime.
    pub async fn connect(config: &tokio_postgres::Config, tls: &TlsSettings) -> Result<Self> {
        tracing::info!(
            hosts = ?config.get_hosts(),
            database = ?config.get_dbname(),
            ssl_mode = tls.mode.as_str(),
            "connecting to PostgreSQL database"
        );

        let mut config = config.clone();
        config.ssl_mode(tls.mode.to_tokio_postgres());

        let closed = Arc::new(AtomicBool::new(false));

        let (client, io_task) = if tls.is_disabled() {
            let (client, connection) = config.connect(NoTls).await.map_err(|e| {
                VbatchError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;
            (client, spawn_connection(connection, Arc::clone(&closed)))
        } else {
            let connector = tls.build_connector()?;
            let (client, connection) = config.connect(connector).await.map_err(|e| {
                VbatchError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;
            (client, spawn_connection(connection, Arc::clone(&closed)))
        };

        tracing::info!("PostgreSQL connection established");
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            closed,
            io_task,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(VbatchError::Connection(
                "PostgreSQL connection is closed".into(),
            ));
        }
        Ok(())
    }
}

fn spawn_connection<F>(connection: F, closed: Arc<AtomicBool>) -> JoinHandle<()>
where
    F: Future<Output = std::result::Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "PostgreSQL connection error");
        }
        closed.store(true, Ordering::SeqCst);
    })
}

/// Prepare `sql`, bind `params` against the statement's parameter types and collect rows
async fn run_query(client: &Client, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let start_time = std::time::Instant::now();

    // Prepare first so we know the target column types for each parameter
    let statement = client
        .prepare(sql)
        .await
        .map_err(|e| query_error("Failed to prepare query", &e))?;

    let pg_params = bind_params(params, statement.params());
    let param_refs: Vec<&(dyn ToSql + Sync)> =
        pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    let pg_rows = client
        .query(&statement, &param_refs)
        .await
        .map_err(|e| query_error("Failed to execute query", &e))?;

    // Column metadata comes from the statement so empty result sets still have columns
    let columns: Vec<ColumnMeta> = statement
        .columns()
        .iter()
        .enumerate()
        .map(|(ordinal, col)| ColumnMeta {
            name: col.name().to_string(),
            data_type: col.type_().name().to_string(),
            ordinal,
        })
        .collect();
    let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

    let rows = pg_rows
        .iter()
        .map(|pg_row| {
            (0..columns.len())
                .map(|idx| postgres_to_value(pg_row, idx))
                .collect::<Result<Vec<_>>>()
                .map(|values| Row::new(column_names.clone(), values))
        })
        .collect::<Result<Vec<_>>>()?;

    let execution_time_ms = start_time.elapsed().as_millis() as u64;
    tracing::debug!(
        row_count = rows.len(),
        execution_time_ms = execution_time_ms,
        "query executed successfully"
    );

    Ok(QueryResult {
        id: uuid::Uuid::new_v4(),
        columns,
        affected_rows: rows.len() as u64,
        rows,
        execution_time_ms,
    })
}

async fn run_statement(client: &Client, sql: &str, params: &[Value]) -> Result<StatementResult> {
    let statement = client
        .prepare(sql)
        .await
        .map_err(|e| query_error("Failed to prepare statement", &e))?;

    let pg_params = bind_params(params, statement.params());
    let param_refs: Vec<&(dyn ToSql + Sync)> =
        pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    let rows_affected = client
        .execute(&statement, &param_refs)
        .await
        .map_err(|e| query_error("Failed to execute statement", &e))?;

    tracing::debug!(affected_rows = rows_affected, "statement executed");
    Ok(StatementResult {
        affected_rows: rows_affected,
    })
}

fn bind_params(params: &[Value], param_types: &[Type]) -> Vec<PgValue> {
    params
        .iter()
        .enumerate()
        .map(|(i, value)| match param_types.get(i) {
            Some(target_type) => PgValue::from_value_for_type(value, target_type),
            None => PgValue::from_value(value),
        })
        .collect()
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgres"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.ensure_open()?;
        let client = self.client.lock().await;
        run_statement(&client, sql, params).await
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        let client = self.client.lock().await;
        run_query(&client, sql, params).await
    }

    fn literals(&self) -> &dyn LiteralDialect {
        &POSTGRES_LITERALS
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        tracing::debug!("beginning PostgreSQL transaction");
        self.ensure_open()?;

        let client = Arc::clone(&self.client).lock_owned().await;
        client
            .batch_execute("BEGIN")
            .await
            .map_err(|e| query_error("Failed to begin transaction", &e))?;

        tracing::debug!("PostgreSQL transaction begun successfully");
        Ok(Box::new(PostgresTransaction {
            client: Some(client),
        }))
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing PostgreSQL connection");
        self.closed.store(true, Ordering::SeqCst);
        self.io_task.abort();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        self.io_task.abort();
    }
}

/// PostgreSQL transaction wrapper
///
/// The transaction holds the connection's client lock until it is committed,
/// rolled back or dropped, so no other statement can interleave with it.
pub struct PostgresTransaction {
    client: Option<OwnedMutexGuard<Client>>,
}

impl PostgresTransaction {
    fn client(&self) -> Result<&Client> {
        self.client
            .as_deref()
            .ok_or_else(|| VbatchError::Query("Transaction already finished".into()))
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };

        tracing::warn!("PostgreSQL transaction dropped without commit or rollback, rolling back");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.batch_execute("ROLLBACK").await {
                        tracing::error!(error = %e, "automatic rollback on drop failed");
                    }
                });
            }
            Err(_) => {
                tracing::error!("no tokio runtime to roll back dropped PostgreSQL transaction")
            }
        }
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("committing PostgreSQL transaction");
        let client = self
            .client
            .take()
            .ok_or_else(|| VbatchError::Query("Transaction already finished".into()))?;

        client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| query_error("Failed to commit transaction", &e))?;

        tracing::debug!("PostgreSQL transaction committed successfully");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("rolling back PostgreSQL transaction");
        let Some(client) = self.client.take() else {
            return Ok(());
        };

        client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| query_error("Failed to rollback transaction", &e))?;

        tracing::debug!("PostgreSQL transaction rolled back successfully");
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing query in transaction");
        run_query(self.client()?, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement in transaction");
        run_statement(self.client()?, sql, params).await
    }
}

/// Wrapper enum for converting `vbatch_core::Value` to types implementing ToSql.
#[derive(Debug)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    DateTimeUtc(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
}

impl PgValue {
    /// Convert a value into the variant matching the target parameter type, so
    /// tokio-postgres writes the correct binary width (4 bytes for INT4, not 8).
    pub(crate) fn from_value_for_type(value: &Value, target_type: &Type) -> Self {
        match value {
            Value::Int16(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int32(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int64(v) => Self::coerce_int(*v, target_type),
            Value::Float32(v) if *target_type == Type::FLOAT8 => PgValue::Float64(*v as f64),
            Value::Float64(v) if *target_type == Type::FLOAT4 => PgValue::Float32(*v as f32),
            Value::String(v) if matches!(*target_type, Type::JSON | Type::JSONB) => {
                serde_json::from_str::<serde_json::Value>(v)
                    .map(PgValue::Json)
                    .unwrap_or_else(|_| PgValue::String(v.clone()))
            }
            other => Self::from_value(other),
        }
    }

    fn coerce_int(value: i64, target_type: &Type) -> Self {
        match *target_type {
            Type::INT2 => PgValue::Int16(value as i16),
            Type::INT4 => PgValue::Int32(value as i32),
            _ => PgValue::Int64(value),
        }
    }

    /// Fallback used when the target type is unknown
    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int16(v) => PgValue::Int16(*v),
            Value::Int32(v) => PgValue::Int32(*v),
            Value::Int64(v) => PgValue::Int64(*v),
            Value::Float32(v) => PgValue::Float32(*v),
            Value::Float64(v) => PgValue::Float64(*v),
            Value::Decimal(v) => PgValue::String(v.clone()),
            Value::String(v) => PgValue::String(v.clone()),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::DateTimeUtc(v) => PgValue::DateTimeUtc(*v),
            Value::Date(v) => PgValue::Date(*v),
            Value::Time(v) => PgValue::Time(*v),
            Value::DateTime(v) => PgValue::DateTime(*v),
            Value::Array(_) | Value::Map(_) => PgValue::Json(value.to_json()),
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(postgres_types::IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::DateTimeUtc(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::Time(v) => v.to_sql(ty, out),
            PgValue::DateTime(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

/// NUMERIC decoded from its binary wire format into decimal text
#[derive(Debug)]
pub(crate) struct PgNumericString(pub(crate) String);

/// Raw UTF-8 payload of a type we have no decoder for (enums, domains)
#[derive(Debug)]
struct PgFallbackString(String);

impl PgNumericString {
    pub(crate) fn parse(
        raw: &[u8],
    ) -> std::result::Result<String, Box<dyn std::error::Error + Sync + Send>> {
        if raw.len() < 8 {
            return Err("invalid NUMERIC payload: too short".into());
        }

        let ndigits = i16::from_be_bytes([raw[0], raw[1]]);
        let weight = i16::from_be_bytes([raw[2], raw[3]]);
        let sign = u16::from_be_bytes([raw[4], raw[5]]);
        let dscale = i16::from_be_bytes([raw[6], raw[7]]);

        if ndigits < 0 || dscale < 0 {
            return Err("invalid NUMERIC payload: negative digit count or scale".into());
        }
        let ndigits = ndigits as usize;
        let dscale = dscale as usize;

        if raw.len() < 8 + ndigits * 2 {
            return Err("invalid NUMERIC payload: truncated digits".into());
        }
        match sign {
            0x0000 | 0x4000 => {}
            0xC000 => return Ok("NaN".to_string()),
            0xD000 => return Ok("Infinity".to_string()),
            0xF000 => return Ok("-Infinity".to_string()),
            _ => return Err(format!("invalid NUMERIC payload: unknown sign {sign:#06x}").into()),
        }

        let digits = raw[8..8 + ndigits * 2]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        if digits.iter().any(|group| *group > 9999) {
            return Err("invalid NUMERIC payload: group out of range".into());
        }
        if digits.is_empty() {
            return Ok("0".to_string());
        }

        let integer_groups = if weight >= 0 { weight as usize + 1 } else { 0 };

        let mut integer_text = String::new();
        if integer_groups == 0 {
            integer_text.push('0');
        }
        for index in 0..integer_groups {
            let group = digits.get(index).copied().unwrap_or(0);
            if index == 0 {
                integer_text.push_str(&group.to_string());
            } else {
                integer_text.push_str(&format!("{group:04}"));
            }
        }

        // Groups between the decimal point and the first stored group are zero
        let mut fraction_text = String::new();
        if weight < -1 {
            fraction_text.push_str(&"0000".repeat((-weight - 1) as usize));
        }
        for group in digits.iter().skip(integer_groups.min(digits.len())) {
            fraction_text.push_str(&format!("{group:04}"));
        }
        if fraction_text.len() < dscale {
            fraction_text.push_str(&"0".repeat(dscale - fraction_text.len()));
        } else {
            fraction_text.truncate(dscale);
        }

        let mut output = String::new();
        if sign == 0x4000 {
            output.push('-');
        }
        output.push_str(&integer_text);
        if !fraction_text.is_empty() {
            output.push('.');
            output.push_str(&fraction_text);
        }

        Ok(output)
    }
}

impl<'a> FromSql<'a> for PgNumericString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(Self::parse(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

impl<'a> FromSql<'a> for PgFallbackString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(String::from_utf8(raw.to_vec())?))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn get_array<'a, T: FromSql<'a>>(
    row: &'a PgRow,
    idx: usize,
    wrap: impl Fn(T) -> Value,
) -> Option<Value> {
    get::<Vec<T>>(row, idx).map(|items| Value::Array(items.into_iter().map(wrap).collect()))
}

/// Convert a column of a PostgreSQL row to our Value type
fn postgres_to_value(row: &PgRow, idx: usize) -> Result<Value> {
    let type_name = row.columns()[idx].type_().name();

    let value = match type_name {
        "bool" => get(row, idx).map(Value::Bool),
        "int2" => get(row, idx).map(Value::Int16),
        "int4" => get(row, idx).map(Value::Int32),
        "int8" => get(row, idx).map(Value::Int64),
        "float4" => get(row, idx).map(Value::Float32),
        "float8" => get(row, idx).map(Value::Float64),
        "numeric" => get::<PgNumericString>(row, idx).map(|n| Value::Decimal(n.0)),
        "text" | "varchar" | "bpchar" | "name" => get(row, idx).map(Value::String),
        "bytea" => get(row, idx).map(Value::Bytes),
        "uuid" => get(row, idx).map(Value::Uuid),
        "json" | "jsonb" => get(row, idx).map(Value::Json),
        "date" => get(row, idx).map(Value::Date),
        "time" => get(row, idx).map(Value::Time),
        "timestamp" => get(row, idx).map(Value::DateTime),
        "timestamptz" => get(row, idx).map(Value::DateTimeUtc),
        "_text" | "_varchar" | "_bpchar" | "_name" => get_array(row, idx, Value::String),
        "_int2" => get_array(row, idx, Value::Int16),
        "_int4" => get_array(row, idx, Value::Int32),
        "_int8" => get_array(row, idx, Value::Int64),
        "_float8" => get_array(row, idx, Value::Float64),
        "_bool" => get_array(row, idx, Value::Bool),
        _ => get::<PgFallbackString>(row, idx).map(|s| Value::String(s.0)),
    };

    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numeric_payload(weight: i16, sign: u16, dscale: i16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as i16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for digit in digits {
            raw.extend_from_slice(&digit.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_numeric_integer_and_fraction() {
        // 12345.67 = groups [1, 2345, 6700], weight 1
        let raw = numeric_payload(1, 0x0000, 2, &[1, 2345, 6700]);
        assert_eq!(PgNumericString::parse(&raw).unwrap(), "12345.67");
    }

    #[test]
    fn test_numeric_negative() {
        let raw = numeric_payload(0, 0x4000, 1, &[42, 5000]);
        assert_eq!(PgNumericString::parse(&raw).unwrap(), "-42.5");
    }

    #[test]
    fn test_numeric_small_fraction() {
        // 0.00001 = group [1000] with weight -2
        let raw = numeric_payload(-2, 0x0000, 5, &[1000]);
        assert_eq!(PgNumericString::parse(&raw).unwrap(), "0.00001");
    }

    #[test]
    fn test_numeric_zero_and_nan() {
        assert_eq!(
            PgNumericString::parse(&numeric_payload(0, 0, 0, &[])).unwrap(),
            "0"
        );
        assert_eq!(
            PgNumericString::parse(&numeric_payload(0, 0xC000, 0, &[])).unwrap(),
            "NaN"
        );
    }

    #[test]
    fn test_numeric_truncated_payload() {
        assert!(PgNumericString::parse(&[0, 1]).is_err());
        let mut raw = numeric_payload(0, 0, 0, &[1, 2]);
        raw.truncate(10);
        assert!(PgNumericString::parse(&raw).is_err());
    }

    #[test]
    fn test_numeric_infinities() {
        assert_eq!(
            PgNumericString::parse(&numeric_payload(0, 0xD000, 0, &[])).unwrap(),
            "Infinity"
        );
        assert_eq!(
            PgNumericString::parse(&numeric_payload(0, 0xF000, 0, &[])).unwrap(),
            "-Infinity"
        );
    }

    #[test]
    fn test_numeric_malformed_header() {
        let mut negative_ndigits = numeric_payload(0, 0, 0, &[]);
        negative_ndigits[0..2].copy_from_slice(&(-1i16).to_be_bytes());
        assert!(PgNumericString::parse(&negative_ndigits).is_err());

        let mut negative_scale = numeric_payload(0, 0, 0, &[1]);
        negative_scale[6..8].copy_from_slice(&(-3i16).to_be_bytes());
        assert!(PgNumericString::parse(&negative_scale).is_err());

        assert!(PgNumericString::parse(&numeric_payload(0, 0x1234, 0, &[1])).is_err());
    }

    #[test]
    fn test_int_params_follow_target_width() {
        assert!(matches!(
            PgValue::from_value_for_type(&Value::Int64(5), &Type::INT4),
            PgValue::Int32(5)
        ));
        assert!(matches!(
            PgValue::from_value_for_type(&Value::Int32(5), &Type::INT8),
            PgValue::Int64(5)
        ));
    }

    #[test]
    fn test_string_param_for_jsonb_is_parsed() {
        let value = PgValue::from_value_for_type(&Value::from(r#"{"a":1}"#), &Type::JSONB);
        assert!(matches!(value, PgValue::Json(_)));
        let value = PgValue::from_value_for_type(&Value::from("not json"), &Type::JSONB);
        assert!(matches!(value, PgValue::String(_)));
    }
}
