use crate::errors::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use rusqlite::types::ValueRef;
use std::iter::FromIterator;

pub fn read_data_from_stdin() -> Result<String> {
    let mut data = String::new();
    std::io::stdin().read_to_string(&mut data).map_err(
        |_| Error::InputReadFailure
    )?;
    Ok(data)
}

pub fn read_data_from_file(path_str: &str) -> Result<String> {
    let path = Path::new(path_str).canonicalize().map_err(
        |_| Error::InvalidInputPath(path_str.into())
    )?;
    let mut file = File::open(&path).map_err(
        |_| Error::InvalidInputFile(path_str.into())
    )?;
    let mut data = String::new();
    file.read_to_string(&mut data).map_err(
        |_| Error::InputReadFailure
    )?;
    Ok(data)
}

/// Reads the named columns of a table into `{column: [values...]}`.
pub fn db_table_to_json_object(
    conn: &rusqlite::Connection, table_name: &str,
    column_names: &[&str]
) -> Result<serde_json::Value> {
    let mut col_values_pairs = Vec::with_capacity(column_names.len());
    for c in column_names {
        let mut statement = conn.prepare(
            &format!("SELECT {} FROM {};", c, table_name)
        )?;
        let values = statement.query_map(rusqlite::params![], |row| {
            Ok(
                match row.get_raw(0) {
                    ValueRef::Null => {
                        serde_json::Value::Null
                    },
                    ValueRef::Integer(val) => {
                        val.into()
                    },
                    ValueRef::Real(val) => {
                        val.into()
                    },
                    ValueRef::Text(val) => {
                        serde_json::Value::String(String::from_utf8_lossy(val).into_owned())
                    },
                    ValueRef::Blob(val) => {
                        serde_json::Value::Array(val.iter().map(|b| (*b).into()).collect())
                    },
                }
            )
        })?.collect::<rusqlite::Result<Vec<_>>>()?;

        col_values_pairs.push((String::from(*c), serde_json::Value::Array(values)));
    }

    let map = serde_json::Map::from_iter(col_values_pairs);

    Ok(serde_json::Value::Object(map))
}
