//! Test fixtures shared by the engine tests: a formatter that renders
//! statements in a structured debug dialect, and an in-memory resource that
//! executes them. Filter evaluation inside the resource reuses the
//! algebra's own `Filter::matches`, so the engine is exercised end to end
//! without a vendor.

use crate::{
    expr::{ColumnPath, Expr},
    filter::{Filter, RowAccessor},
    format::{BatchLimits, FormatError, SqlFormatter, Statement},
    query::{AggregateKind, AggregateQuery, SelectQuery},
    resource::{RowCursor, RowSet, StorageError, StorageResource},
    schema::SchemaCatalog,
    value::Value,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
    time::Duration,
};

///
/// Op
///
/// The debug dialect: one JSON document per statement.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) enum Op {
    Select(SelectQuery),
    Aggregate(AggregateQuery),
    Insert {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Value)>,
        filter: Filter,
    },
    Delete {
        table: String,
        filter: Filter,
    },
}

///
/// DebugFormatter
///

#[derive(Clone, Debug, Default)]
pub(crate) struct DebugFormatter {
    pub(crate) limits: BatchLimits,
}

impl DebugFormatter {
    fn render(op: &Op) -> Result<Statement, FormatError> {
        serde_json::to_string(op)
            .map(Statement::new)
            .map_err(|err| FormatError::Render(err.to_string()))
    }
}

impl SqlFormatter for DebugFormatter {
    fn select(&self, query: &SelectQuery) -> Result<Statement, FormatError> {
        Self::render(&Op::Select(query.clone()))
    }

    fn aggregate(&self, query: &AggregateQuery) -> Result<Statement, FormatError> {
        Self::render(&Op::Aggregate(query.clone()))
    }

    fn insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<Statement, FormatError> {
        Self::render(&Op::Insert {
            table: table.to_string(),
            columns: columns.to_vec(),
            rows: rows.to_vec(),
        })
    }

    fn update(
        &self,
        table: &str,
        assignments: &[(String, Value)],
        filter: &Filter,
    ) -> Result<Statement, FormatError> {
        Self::render(&Op::Update {
            table: table.to_string(),
            assignments: assignments.to_vec(),
            filter: filter.clone(),
        })
    }

    fn delete(&self, table: &str, filter: &Filter) -> Result<Statement, FormatError> {
        Self::render(&Op::Delete {
            table: table.to_string(),
            filter: filter.clone(),
        })
    }

    fn limits(&self) -> BatchLimits {
        self.limits
    }

    fn insert_base_len(&self, table: &str, columns: &[String]) -> usize {
        Self::render(&Op::Insert {
            table: table.to_string(),
            columns: columns.to_vec(),
            rows: Vec::new(),
        })
        .map_or(0, |s| s.len())
    }

    fn insert_row_len(&self, _columns: &[String], row: &[Value]) -> usize {
        serde_json::to_string(row).map_or(0, |s| s.len() + 1)
    }
}

///
/// MemTable / MemoryStore
///

#[derive(Clone, Debug)]
pub(crate) struct MemTable {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Value>>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryStore {
    pub(crate) tables: BTreeMap<String, MemTable>,
}

impl MemoryStore {
    pub(crate) fn from_catalog(catalog: &SchemaCatalog) -> Self {
        let mut tables = BTreeMap::new();
        for table in catalog.tables() {
            tables.insert(
                table.name().to_string(),
                MemTable {
                    columns: table
                        .columns()
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect(),
                    rows: Vec::new(),
                },
            );
        }
        Self { tables }
    }

    pub(crate) fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }
}

struct MemRow<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl RowAccessor for MemRow<'_> {
    fn value(&self, path: &ColumnPath) -> Option<Value> {
        if !path.is_simple() {
            return None;
        }
        let index = self.columns.iter().position(|c| c == path.leaf())?;
        self.values.get(index).cloned()
    }
}

/// Variant-wise total order with NULL first; good enough for test data.
fn value_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Money(x), Value::Money(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::Guid(x), Value::Guid(y)) => x.cmp(y),
        (Value::Binary(x), Value::Binary(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

///
/// TestHarness
///
/// Shared handles into a resource the engine owns: the backing store, the
/// statement log, and the write-failure injector.
///

#[derive(Clone)]
pub(crate) struct TestHarness {
    pub(crate) store: Arc<Mutex<MemoryStore>>,
    pub(crate) log: Arc<Mutex<Vec<String>>>,
    pub(crate) raw: Arc<Mutex<Vec<String>>>,
    pub(crate) fail_writes: Arc<AtomicUsize>,
}

impl TestHarness {
    pub(crate) fn new(catalog: &SchemaCatalog) -> Self {
        Self {
            store: Arc::new(Mutex::new(MemoryStore::from_catalog(catalog))),
            log: Arc::new(Mutex::new(Vec::new())),
            raw: Arc::new(Mutex::new(Vec::new())),
            fail_writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The last statement executed, decoded back into its operation.
    pub(crate) fn last_op(&self) -> Option<Op> {
        let raw = self.raw.lock();
        serde_json::from_str(raw.last()?).ok()
    }

    /// Statement-kind log entries like `select:item`.
    pub(crate) fn log_entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub(crate) fn count_ops(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    pub(crate) fn clear_log(&self) {
        self.log.lock().clear();
    }

    /// Make the next `n` write statements fail with contention.
    pub(crate) fn fail_next_writes(&self, n: usize) {
        self.fail_writes.store(n, AtomicOrdering::SeqCst);
    }

    pub(crate) fn resource(&self, name: &str) -> MemoryResource {
        MemoryResource {
            name: name.to_string(),
            store: Arc::clone(&self.store),
            log: Arc::clone(&self.log),
            raw: Arc::clone(&self.raw),
            fail_writes: Arc::clone(&self.fail_writes),
            open: false,
            snapshot: None,
            timeout: None,
        }
    }
}

///
/// MemoryResource
///

pub(crate) struct MemoryResource {
    name: String,
    store: Arc<Mutex<MemoryStore>>,
    log: Arc<Mutex<Vec<String>>>,
    raw: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicUsize>,
    open: bool,
    snapshot: Option<MemoryStore>,
    timeout: Option<Duration>,
}

impl MemoryResource {
    fn parse(statement: &Statement) -> Result<Op, StorageError> {
        serde_json::from_str(statement.text())
            .map_err(|err| StorageError::Execution(format!("bad statement: {err}")))
    }

    fn log_op(&self, op: &Op, statement: &Statement) {
        let entry = match op {
            Op::Select(q) => format!("select:{}", q.table),
            Op::Aggregate(q) => format!("aggregate:{}", q.table),
            Op::Insert { table, .. } => format!("insert:{table}"),
            Op::Update { table, .. } => format!("update:{table}"),
            Op::Delete { table, .. } => format!("delete:{table}"),
        };
        self.log.lock().push(entry);
        self.raw.lock().push(statement.text().to_string());
    }

    fn take_write_failure(&self) -> Option<StorageError> {
        let remaining = self.fail_writes.load(AtomicOrdering::SeqCst);
        if remaining == 0 {
            return None;
        }
        self.fail_writes.store(remaining - 1, AtomicOrdering::SeqCst);
        Some(StorageError::Contention("injected".to_string()))
    }

    fn matching_indexes(
        table: &MemTable,
        filter: Option<&Filter>,
    ) -> Result<Vec<usize>, StorageError> {
        let mut out = Vec::new();
        for (index, values) in table.rows.iter().enumerate() {
            let row = MemRow {
                columns: &table.columns,
                values,
            };
            let matched = match filter {
                Some(filter) => filter
                    .matches(&row)
                    .map_err(|err| StorageError::Execution(err.to_string()))?,
                None => true,
            };
            if matched {
                out.push(index);
            }
        }
        Ok(out)
    }

    fn run_select(store: &MemoryStore, query: &SelectQuery) -> Result<RowSet, StorageError> {
        let table = store
            .tables
            .get(&query.table)
            .ok_or_else(|| StorageError::Execution(format!("unknown table `{}`", query.table)))?;

        let mut indexes = Self::matching_indexes(table, query.filter.as_ref())?;

        for order in query.order.iter().rev() {
            let Expr::Column(path) = &order.expr else {
                continue;
            };
            let Some(column) = table.columns.iter().position(|c| c == path.leaf()) else {
                continue;
            };
            indexes.sort_by(|&a, &b| {
                let ord = value_order(&table.rows[a][column], &table.rows[b][column]);
                if order.descending { ord.reverse() } else { ord }
            });
        }

        let headers: Vec<String> = query.outputs.iter().map(ToString::to_string).collect();
        let mut rows: Vec<Vec<Value>> = Vec::new();
        for index in indexes {
            let values = &table.rows[index];
            let row = MemRow {
                columns: &table.columns,
                values,
            };
            let mut out = Vec::with_capacity(query.outputs.len());
            for output in &query.outputs {
                out.push(match output {
                    Expr::Constant(constant) => constant.value.clone(),
                    Expr::Column(path) => row.value(path).ok_or_else(|| {
                        StorageError::Execution(format!("unknown column `{path}`"))
                    })?,
                });
            }
            if query.distinct && rows.contains(&out) {
                continue;
            }
            rows.push(out);
            if query
                .row_cap
                .is_some_and(|cap| rows.len() as u64 >= cap)
            {
                break;
            }
        }

        Ok(RowSet::new(headers, rows))
    }

    fn run_aggregate(store: &MemoryStore, query: &AggregateQuery) -> Result<Value, StorageError> {
        let table = store
            .tables
            .get(&query.table)
            .ok_or_else(|| StorageError::Execution(format!("unknown table `{}`", query.table)))?;

        let indexes = Self::matching_indexes(table, query.filter.as_ref())?;

        let Some(column_name) = &query.column else {
            return Ok(Value::Int(indexes.len() as i64));
        };
        let column = table
            .columns
            .iter()
            .position(|c| c == column_name)
            .ok_or_else(|| StorageError::Execution(format!("unknown column `{column_name}`")))?;

        let values: Vec<&Value> = indexes
            .iter()
            .map(|&i| &table.rows[i][column])
            .filter(|v| !v.is_null())
            .collect();

        Ok(match query.kind {
            AggregateKind::Count => Value::Int(values.len() as i64),
            AggregateKind::Min => values
                .iter()
                .min_by(|a, b| value_order(a, b))
                .map_or(Value::Null, |v| (*v).clone()),
            AggregateKind::Max => values
                .iter()
                .max_by(|a, b| value_order(a, b))
                .map_or(Value::Null, |v| (*v).clone()),
            AggregateKind::Sum => sum_values(&values),
        })
    }

    fn run_write(&mut self, op: Op) -> Result<u64, StorageError> {
        if let Some(failure) = self.take_write_failure() {
            return Err(failure);
        }

        let mut store = self.store.lock();
        match op {
            Op::Insert {
                table,
                columns,
                rows,
            } => {
                let table = store
                    .tables
                    .get_mut(&table)
                    .ok_or_else(|| StorageError::Execution(format!("unknown table `{table}`")))?;
                let positions: Vec<usize> = columns
                    .iter()
                    .map(|name| {
                        table.columns.iter().position(|c| c == name).ok_or_else(|| {
                            StorageError::Execution(format!("unknown column `{name}`"))
                        })
                    })
                    .collect::<Result<_, _>>()?;

                let width = table.columns.len();
                let count = rows.len();
                for row in rows {
                    let mut full = vec![Value::Null; width];
                    for (position, value) in positions.iter().zip(row) {
                        full[*position] = value;
                    }
                    table.rows.push(full);
                }
                Ok(count as u64)
            }

            Op::Update {
                table,
                assignments,
                filter,
            } => {
                let table = store
                    .tables
                    .get_mut(&table)
                    .ok_or_else(|| StorageError::Execution(format!("unknown table `{table}`")))?;
                let indexes = Self::matching_indexes(table, Some(&filter))?;
                let positions: Vec<(usize, Value)> = assignments
                    .into_iter()
                    .map(|(name, value)| {
                        table
                            .columns
                            .iter()
                            .position(|c| c == &name)
                            .map(|p| (p, value))
                            .ok_or_else(|| {
                                StorageError::Execution(format!("unknown column `{name}`"))
                            })
                    })
                    .collect::<Result<_, _>>()?;

                for &index in &indexes {
                    for (position, value) in &positions {
                        table.rows[index][*position] = value.clone();
                    }
                }
                Ok(indexes.len() as u64)
            }

            Op::Delete { table, filter } => {
                let table = store
                    .tables
                    .get_mut(&table)
                    .ok_or_else(|| StorageError::Execution(format!("unknown table `{table}`")))?;
                let indexes = Self::matching_indexes(table, Some(&filter))?;
                let removed = indexes.len();
                for index in indexes.into_iter().rev() {
                    table.rows.remove(index);
                }
                Ok(removed as u64)
            }

            Op::Select(_) | Op::Aggregate(_) => {
                Err(StorageError::Execution("not a write statement".to_string()))
            }
        }
    }
}

fn sum_values(values: &[&Value]) -> Value {
    let Some(first) = values.first() else {
        return Value::Null;
    };
    match first {
        Value::Int(_) => Value::Int(
            values
                .iter()
                .filter_map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .sum(),
        ),
        Value::Float(_) => Value::Float(
            values
                .iter()
                .filter_map(|v| match v {
                    Value::Float(f) => Some(*f),
                    _ => None,
                })
                .sum(),
        ),
        Value::Money(_) => Value::Money(
            values
                .iter()
                .filter_map(|v| match v {
                    Value::Money(d) => Some(*d),
                    _ => None,
                })
                .sum(),
        ),
        _ => Value::Null,
    }
}

///
/// MemCursor
///

struct MemCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
}

impl RowCursor for MemCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>, StorageError> {
        Ok(self.rows.pop_front())
    }
}

impl StorageResource for MemoryResource {
    fn identity(&self) -> &str {
        &self.name
    }

    fn execute_scalar(&mut self, statement: &Statement) -> Result<Value, StorageError> {
        let op = Self::parse(statement)?;
        self.log_op(&op, statement);
        let store = self.store.lock();
        match &op {
            Op::Aggregate(query) => Self::run_aggregate(&store, query),
            Op::Select(query) => Ok(Self::run_select(&store, query)?
                .scalar()
                .cloned()
                .unwrap_or(Value::Null)),
            _ => Err(StorageError::Execution("not a scalar statement".to_string())),
        }
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StorageError> {
        let op = Self::parse(statement)?;
        self.log_op(&op, statement);
        self.run_write(op)
    }

    fn execute_rows(&mut self, statement: &Statement) -> Result<RowSet, StorageError> {
        let op = Self::parse(statement)?;
        self.log_op(&op, statement);
        let store = self.store.lock();
        match &op {
            Op::Select(query) => Self::run_select(&store, query),
            Op::Aggregate(query) => {
                let value = Self::run_aggregate(&store, query)?;
                Ok(RowSet::new(vec!["value".to_string()], vec![vec![value]]))
            }
            _ => Err(StorageError::Execution(
                "not a tabular statement".to_string(),
            )),
        }
    }

    fn execute_cursor(
        &mut self,
        statement: &Statement,
    ) -> Result<Box<dyn RowCursor + '_>, StorageError> {
        let rows = self.execute_rows(statement)?;
        Ok(Box::new(MemCursor {
            columns: rows.columns().to_vec(),
            rows: rows.into_rows().into(),
        }))
    }

    fn begin(&mut self) -> Result<(), StorageError> {
        if self.open {
            return Err(StorageError::TransactionOpen);
        }
        self.snapshot = Some(self.store.lock().clone());
        self.open = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if !self.open {
            return Err(StorageError::NoTransaction);
        }
        self.open = false;
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        if !self.open {
            return Err(StorageError::NoTransaction);
        }
        if let Some(snapshot) = self.snapshot.take() {
            *self.store.lock() = snapshot;
        }
        self.open = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.open
    }

    fn set_command_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }
}
