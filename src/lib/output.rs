use indoc::indoc;
use log::info;
use std::convert::TryFrom;
use std::path::Path;
use unindent::unindent;

use crate::cohort::CohortOutcome;
use crate::config::RunConfig;
use crate::errors::*;
use crate::stats::{IntervalKind, SummaryStat};
use crate::util::db_table_to_json_object;

const META_SQL: &str = "INSERT INTO Meta VALUES (?,?);";
const ALIVE_CURVES_SQL: &str = "INSERT INTO AliveCurves VALUES (?,?,?);";
const COHORT_OUTCOMES_SQL: &str = indoc!("
    INSERT INTO CohortOutcomes VALUES (?,?,?,?,?,?,?,?,?,?,?);
");
const SUMMARY_STATS_SQL: &str = indoc!("
    INSERT INTO SummaryStats VALUES (?,?,?,?,?,?);
");

const COHORT_OUTCOMES_COLUMNS: [&str; 11] = [
    "cohort_id", "population_size", "n_absorbed", "mean_survival_time",
    "restricted_mean_survival_time", "mean_n_diagnoses", "mean_time_to_diagnosis",
    "n_cause_specific_deaths", "mean_cost", "mean_utility", "horizon",
];

/// Final results of a run, stored in SQLite.
pub struct ResultsDb {
    conn: rusqlite::Connection,
}

fn to_i64<T>(x: T) -> Result<i64>
    where T: Copy + std::fmt::Display, i64: TryFrom<T>
{
    i64::try_from(x).map_err(|_| Error::IntegerOverflow(x.to_string()))
}

/// SQLite has no NaN; store it as NULL.
fn real(x: f64) -> Option<f64> {
    if x.is_nan() { None } else { Some(x) }
}

impl ResultsDb {
    /// Creates a fresh database file. An existing file is never overwritten.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(Error::OutputExists(path.to_string_lossy().into_owned()));
        }
        Self::init(rusqlite::Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(rusqlite::Connection::open_in_memory()?)
    }

    fn init(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute_batch(&unindent("
            CREATE TABLE Meta (key TEXT, value TEXT);
            CREATE TABLE CohortOutcomes (
                cohort_id INTEGER, population_size INTEGER, n_absorbed INTEGER,
                mean_survival_time REAL, restricted_mean_survival_time REAL,
                mean_n_diagnoses REAL, mean_time_to_diagnosis REAL,
                n_cause_specific_deaths INTEGER, mean_cost REAL, mean_utility REAL,
                horizon REAL
            );
            CREATE TABLE AliveCurves (cohort_id INTEGER, time REAL, count INTEGER);
            CREATE TABLE SummaryStats (
                statistic TEXT, n INTEGER, mean REAL, stdev REAL, lower REAL, upper REAL
            );
        "))?;
        Ok(Self { conn })
    }

    pub fn write_meta(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(META_SQL, rusqlite::params![key, value])?;
        Ok(())
    }

    /// Records what the run was, so a results file explains itself.
    pub fn write_run_meta(&mut self, config: &RunConfig, rng_seed: u64) -> Result<()> {
        self.write_meta("rng_seed", &rng_seed.to_string())?;
        self.write_meta("group", &config.group)?;
        self.write_meta("intervention", &config.intervention)?;
        self.write_meta("population_size", &config.population_size.to_string())?;
        self.write_meta("horizon", &config.horizon.to_string())?;
        if let Some(n_cohorts) = config.n_cohorts {
            self.write_meta("n_cohorts", &n_cohorts.to_string())?;
        }
        Ok(())
    }

    /// Writes each cohort's summary row and alive curve.
    pub fn write_cohorts<'a, I>(&mut self, cohorts: I) -> Result<()>
        where I: IntoIterator<Item = &'a CohortOutcome>
    {
        let tx = self.conn.transaction()?;
        {
            let mut insert_cohort = tx.prepare(COHORT_OUTCOMES_SQL)?;
            let mut insert_point = tx.prepare(ALIVE_CURVES_SQL)?;
            for cohort in cohorts {
                let cohort_id = to_i64(cohort.cohort_id)?;
                insert_cohort.execute(rusqlite::params![
                    cohort_id,
                    to_i64(cohort.population_size)?,
                    to_i64(cohort.n_absorbed())?,
                    cohort.mean_survival_time(),
                    real(cohort.restricted_mean_survival_time()),
                    real(cohort.n_diagnoses.mean()),
                    cohort.mean_time_to_diagnosis(),
                    to_i64(cohort.n_cause_specific_deaths())?,
                    real(cohort.cost.mean()),
                    real(cohort.utility.mean()),
                    cohort.horizon,
                ])?;
                for (time, count) in cohort.alive_curve.points() {
                    insert_point.execute(rusqlite::params![cohort_id, *time, to_i64(*count)?])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Writes one row per statistic with the requested interval.
    pub fn write_summary_stats<'a, I>(&mut self, stats: I, kind: IntervalKind, alpha: f64) -> Result<()>
        where I: IntoIterator<Item = &'a SummaryStat>
    {
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(SUMMARY_STATS_SQL)?;
            for stat in stats {
                let (lower, upper) = stat.interval(kind, alpha);
                insert.execute(rusqlite::params![
                    stat.name,
                    to_i64(stat.count())?,
                    real(stat.mean()),
                    real(stat.stdev()),
                    real(lower),
                    real(upper),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All tables as `{table: {column: [values...]}}`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("Meta".into(), db_table_to_json_object(&self.conn, "Meta", &["key", "value"])?);
        map.insert(
            "CohortOutcomes".into(),
            db_table_to_json_object(&self.conn, "CohortOutcomes", &COHORT_OUTCOMES_COLUMNS)?
        );
        map.insert(
            "AliveCurves".into(),
            db_table_to_json_object(&self.conn, "AliveCurves", &["cohort_id", "time", "count"])?
        );
        map.insert(
            "SummaryStats".into(),
            db_table_to_json_object(
                &self.conn, "SummaryStats",
                &["statistic", "n", "mean", "stdev", "lower", "upper"]
            )?
        );
        Ok(serde_json::Value::Object(map))
    }

}

/// Opens the results database at `path`, or in memory when there is none.
pub fn open_results(path: Option<&Path>) -> Result<ResultsDb> {
    match path {
        Some(path) => {
            info!("writing results to {}", path.display());
            ResultsDb::create(path)
        },
        None => ResultsDb::in_memory(),
    }
}
