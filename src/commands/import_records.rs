use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{NewInventory, NewMember, RecordKind},
    ports::database::DatabasePort,
};
use serde::de::DeserializeOwned;
use tower::Service;

use super::{DomainLogic, Error};

#[derive(Clone, Debug)]
pub struct ImportRecordsRequest {
    /// Name of the uploaded file, as sent by the client
    pub filename: String,
    /// Explicit target table
    ///
    /// When `None`, the target is guessed from the filename.
    pub kind: Option<RecordKind>,
    pub contents: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ImportRecordsResponse {
    /// Table the rows went to, or `None` if nothing matched and nothing was stored
    pub kind: Option<RecordKind>,
    pub records: usize,
}

impl<D> Service<ImportRecordsRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    type Response = ImportRecordsResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ImportRecordsRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            if !req.filename.ends_with(".csv") {
                return Err(Error::InvalidFormat(req.filename));
            }

            let kind = req
                .kind
                .or_else(|| RecordKind::from_filename(&req.filename));
            let records = match kind {
                Some(RecordKind::Members) => {
                    let rows = parse_records::<NewMember>(&req.contents)?;
                    database.insert_members(rows).await?.len()
                }
                Some(RecordKind::Inventory) => {
                    let rows = parse_records::<NewInventory>(&req.contents)?;
                    database.insert_inventory(rows).await?.len()
                }
                None => {
                    // The file must still be well-formed CSV even when it goes nowhere
                    csv::Reader::from_reader(req.contents.as_slice())
                        .records()
                        .collect::<Result<Vec<_>, _>>()?;
                    tracing::warn!(filename = %req.filename, "no record kind matched, nothing stored");
                    0
                }
            };

            tracing::info!(
                filename = %req.filename,
                kind = kind.map(|kind| kind.as_str()),
                records,
                "file imported"
            );
            Ok(ImportRecordsResponse { kind, records })
        })
    }
}

/// Parse every row of a CSV file with a header line
///
/// Columns are matched by header name, so their order does not matter. The first bad row fails
/// the whole file.
fn parse_records<T: DeserializeOwned>(contents: &[u8]) -> Result<Vec<T>, csv::Error> {
    csv::Reader::from_reader(contents).deserialize().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::database::memory::MemoryDatabase, ports::database::MockDatabasePort};
    use rstest::*;
    use speculoos::prelude::*;
    use std::sync::Arc;
    use tower::{BoxError, ServiceExt};

    const MEMBERS_CSV: &str = "\
name,surname,booking_count,date_joined
Sophie,Davis,1,2024-01-02T12:10:11.362Z
Emily,Johnson,0,2024-11-12T12:10:12.362Z
Jessica,Rodriguez,2,
";

    const INVENTORY_CSV: &str = "\
title,description,remaining_count,expiration_date
Bali,Lorem ipsum dolor sit amet,5,19/11/2030
Madeira,,4,
";

    #[test]
    fn test_parse_members() {
        let res = parse_records::<NewMember>(MEMBERS_CSV.as_bytes());

        assert_that!(res).is_ok().has_length(3);
        assert_that!(res.unwrap()[2]).is_equal_to(NewMember {
            name: "Jessica".to_string(),
            surname: "Rodriguez".to_string(),
            booking_count: 2,
            date_joined: None,
        });
    }

    #[test]
    fn test_parse_inventory_reordered_columns() {
        let contents = "remaining_count,title,expiration_date,description\n3,Bali,19/11/2030,Beach\n";

        let res = parse_records::<NewInventory>(contents.as_bytes());

        assert_that!(res).is_ok().is_equal_to(vec![NewInventory {
            title: "Bali".to_string(),
            description: Some("Beach".to_string()),
            remaining_count: 3,
            expiration_date: Some("19/11/2030".to_string()),
        }]);
    }

    #[rstest]
    // Missing column
    #[case("name,surname,date_joined\nSophie,Davis,2024-01-02\n")]
    // Count is not a number
    #[case("name,surname,booking_count,date_joined\nSophie,Davis,many,2024-01-02\n")]
    // Negative count
    #[case("name,surname,booking_count,date_joined\nSophie,Davis,-1,2024-01-02\n")]
    // Ragged row
    #[case("name,surname,booking_count,date_joined\nSophie,Davis\n")]
    fn test_parse_malformed(#[case] contents: &str) {
        assert_that!(parse_records::<NewMember>(contents.as_bytes())).is_err();
    }

    #[rstest]
    #[case::members_by_filename("members.csv", None, Some(RecordKind::Members), 3)]
    #[case::members_by_kind("upload.csv", Some(RecordKind::Members), Some(RecordKind::Members), 3)]
    #[case::kind_wins_over_filename("inventory.csv", Some(RecordKind::Members), Some(RecordKind::Members), 3)]
    #[case::no_match("bookings.csv", None, None, 0)]
    #[tokio::test]
    async fn test_call_members(
        #[case] filename: &str,
        #[case] kind: Option<RecordKind>,
        #[case] expected_kind: Option<RecordKind>,
        #[case] expected_records: usize,
    ) -> Result<(), BoxError> {
        // GIVEN an empty database
        let database = MemoryDatabase::default();
        let mut domain = DomainLogic::new(Arc::new(database.clone()));

        // WHEN importing a members file
        let req = ImportRecordsRequest {
            filename: filename.to_string(),
            kind,
            contents: MEMBERS_CSV.as_bytes().to_vec(),
        };
        let res = ServiceExt::<ImportRecordsRequest>::ready(&mut domain)
            .await?
            .call(req)
            .await;

        // THEN the expected number of rows is stored, copied verbatim
        assert_that!(res).is_ok().is_equal_to(ImportRecordsResponse {
            kind: expected_kind,
            records: expected_records,
        });
        if expected_records > 0 {
            let member = database.get_member(1).await?;
            assert_that!(member.name.as_str()).is_equal_to("Sophie");
            assert_that!(member.booking_count).is_equal_to(1);
            assert_that!(member.date_joined)
                .is_equal_to(Some("2024-01-02T12:10:11.362Z".to_string()));
        }
        assert_that!(database.get_member(1).await.is_ok()).is_equal_to(expected_records > 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_call_inventory() -> Result<(), BoxError> {
        // GIVEN an empty database
        let database = MemoryDatabase::default();
        let mut domain = DomainLogic::new(Arc::new(database.clone()));

        // WHEN importing an inventory file
        let req = ImportRecordsRequest {
            filename: "inventory.csv".to_string(),
            kind: None,
            contents: INVENTORY_CSV.as_bytes().to_vec(),
        };
        let res = ServiceExt::<ImportRecordsRequest>::ready(&mut domain)
            .await?
            .call(req)
            .await;

        // THEN both rows are stored
        assert_that!(res).is_ok().is_equal_to(ImportRecordsResponse {
            kind: Some(RecordKind::Inventory),
            records: 2,
        });
        let item = database.get_inventory(2).await?;
        assert_that!(item.title.as_str()).is_equal_to("Madeira");
        assert_that!(item.description).is_none();
        assert_that!(item.remaining_count).is_equal_to(4);

        Ok(())
    }

    #[rstest]
    #[case("members.txt")]
    #[case("members.csv.bak")]
    #[case("")]
    #[tokio::test]
    async fn test_call_invalid_format(#[case] filename: &str) -> Result<(), BoxError> {
        // GIVEN a database that must not be touched
        let mut database = MockDatabasePort::new();
        database.expect_insert_members().never();
        database.expect_insert_inventory().never();
        let mut domain = DomainLogic::new(Arc::new(database));

        // WHEN importing a file without the csv extension
        let req = ImportRecordsRequest {
            filename: filename.to_string(),
            kind: Some(RecordKind::Members),
            contents: MEMBERS_CSV.as_bytes().to_vec(),
        };
        let res = ServiceExt::<ImportRecordsRequest>::ready(&mut domain)
            .await?
            .call(req)
            .await;

        // THEN it is refused
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::InvalidFormat(_)));

        Ok(())
    }

    #[tokio::test]
    async fn test_call_malformed_stores_nothing() -> Result<(), BoxError> {
        // GIVEN a members file whose last row is broken
        let database = MemoryDatabase::default();
        let mut domain = DomainLogic::new(Arc::new(database.clone()));
        let contents = format!("{MEMBERS_CSV}Broken,Row,lots,\n");

        // WHEN importing it
        let req = ImportRecordsRequest {
            filename: "members.csv".to_string(),
            kind: None,
            contents: contents.into_bytes(),
        };
        let res = ServiceExt::<ImportRecordsRequest>::ready(&mut domain)
            .await?
            .call(req)
            .await;

        // THEN it fails and none of the valid rows are kept
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::Csv(_)));
        assert_that!(database.get_member(1).await).is_err();

        Ok(())
    }

    #[tokio::test]
    async fn test_call_unmatched_malformed() -> Result<(), BoxError> {
        // GIVEN a ragged file whose name matches no record kind
        let mut domain = DomainLogic::new(Arc::new(MemoryDatabase::default()));
        let req = ImportRecordsRequest {
            filename: "export.csv".to_string(),
            kind: None,
            contents: b"name,surname,booking_count\nSophie\n".to_vec(),
        };

        // WHEN importing it
        let res = ServiceExt::<ImportRecordsRequest>::ready(&mut domain)
            .await?
            .call(req)
            .await;

        // THEN it is still rejected as malformed
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::Csv(_)));

        Ok(())
    }

    #[test]
    fn test_request_debug_names_file() {
        let req = ImportRecordsRequest {
            filename: "members.csv".to_string(),
            kind: Some(RecordKind::Members),
            contents: Vec::new(),
        };

        assert_that!(format!("{req:?}")).contains("members.csv");
    }
}
