use rusqlite::{params, Connection, OptionalExtension};

use super::triage::parse_uuid;
use crate::db::DatabaseError;
use crate::models::PatientContext;

pub fn insert_patient(conn: &Connection, patient: &PatientContext) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, user_id, age, gender, medical_history)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            patient.id.to_string(),
            patient.user_id,
            patient.age,
            patient.gender,
            patient.medical_history,
        ],
    )?;
    Ok(())
}

/// Insert or update the profile owned by `patient.user_id`.
/// The stored identifier of an existing profile is kept.
pub fn upsert_patient(
    conn: &Connection,
    patient: &PatientContext,
) -> Result<PatientContext, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, user_id, age, gender, medical_history)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id) DO UPDATE SET
            age = excluded.age,
            gender = excluded.gender,
            medical_history = excluded.medical_history",
        params![
            patient.id.to_string(),
            patient.user_id,
            patient.age,
            patient.gender,
            patient.medical_history,
        ],
    )?;
    get_patient_by_user_id(conn, &patient.user_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Patient".into(),
        id: patient.user_id.clone(),
    })
}

pub fn get_patient_by_user_id(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<PatientContext>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, user_id, age, gender, medical_history FROM patients WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<u32>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, user_id, age, gender, medical_history)| {
        Ok(PatientContext {
            id: parse_uuid(&id)?,
            user_id,
            age,
            gender,
            medical_history,
        })
    })
    .transpose()
}
