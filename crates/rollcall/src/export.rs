use std::collections::HashMap;
use std::io::Write;

use thiserror::Error;

use crate::ledger::AttendanceRecord;
use crate::store::UserInfo;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write attendance records as CSV, joined with each identity's contact
/// details. Identities no longer enrolled get empty email and roll number.
pub fn write_csv<W: Write>(
    writer: W,
    records: &[AttendanceRecord],
    users: &[UserInfo],
) -> Result<usize, ExportError> {
    let contacts: HashMap<&str, &UserInfo> =
        users.iter().map(|u| (u.identity.as_str(), u)).collect();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Name", "Email", "Roll Number", "Date", "Time", "Status"])?;

    for record in records {
        let (email, roll_no) = contacts
            .get(record.identity.as_str())
            .map(|u| (u.email.as_str(), u.roll_no.as_str()))
            .unwrap_or(("", ""));
        wtr.write_record([
            record.identity.as_str(),
            email,
            roll_no,
            record.date.as_str(),
            record.time.as_str(),
            record.status.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Status;

    fn record(identity: &str, status: Status) -> AttendanceRecord {
        AttendanceRecord {
            id: "id".to_string(),
            identity: identity.to_string(),
            date: "2026-03-02".to_string(),
            time: "09:00:00".to_string(),
            status,
        }
    }

    #[test]
    fn test_csv_joins_contacts() {
        let users = vec![UserInfo {
            identity: "alice".to_string(),
            email: "alice@example.com".to_string(),
            roll_no: "R-01".to_string(),
            dim: 128,
            created_at: "2026-03-01T00:00:00Z".to_string(),
        }];
        let records = vec![
            record("alice", Status::Present),
            record("ghost", Status::Absent),
        ];

        let mut out = Vec::new();
        let written = write_csv(&mut out, &records, &users).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Name,Email,Roll Number,Date,Time,Status");
        assert_eq!(lines[1], "alice,alice@example.com,R-01,2026-03-02,09:00:00,present");
        assert_eq!(lines[2], "ghost,,,2026-03-02,09:00:00,absent");
    }

    #[test]
    fn test_csv_header_only_when_empty() {
        let mut out = Vec::new();
        assert_eq!(write_csv(&mut out, &[], &[]).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Name,Email,Roll Number,Date,Time,Status\n"
        );
    }
}
