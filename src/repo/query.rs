//! Minimal builder for REST table queries.
//!
//! Covers what the repository needs: the four verbs, `eq` filters, a single
//! `order` clause and single-object responses.

use crate::{
    connection::Connection,
    consts,
    error::{DataError, DataResult},
    models::Table,
};
use reqwest::{Method, RequestBuilder, Response, header};
use serde::{Serialize, de::DeserializeOwned};

pub struct TableQuery<'a> {
    connection: &'a Connection,
    table: Table,
    params: Vec<(String, String)>,
    single: bool,
}

impl<'a> TableQuery<'a> {
    pub fn new(connection: &'a Connection, table: Table) -> Self {
        Self {
            connection,
            table,
            params: Vec::new(),
            single: false,
        }
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{column}.{direction}")));
        self
    }

    /// Expect exactly one row. Zero or several rows become a not-found error.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub async fn select<T: DeserializeOwned>(self) -> DataResult<T> {
        let request = self.request(Method::GET)?.query(&[("select", "*")]);

        decode(send(request).await?).await
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B, T>(self, body: &B) -> DataResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .single()
            .request(Method::POST)?
            .query(&[("select", "*")])
            .header(consts::HEADER_PREFER, consts::PREFER_RETURN_REPRESENTATION)
            .json(body);

        decode(send(request).await?).await
    }

    /// Patch the matching rows and return the result.
    pub async fn update<B, T>(self, body: &B) -> DataResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(Method::PATCH)?
            .query(&[("select", "*")])
            .header(consts::HEADER_PREFER, consts::PREFER_RETURN_REPRESENTATION)
            .json(body);

        decode(send(request).await?).await
    }

    /// Delete the matching rows. Deleting nothing is a not-found error, the
    /// deleted rows are requested back to tell the two apart.
    pub async fn delete(self) -> DataResult<()> {
        let table = self.table;
        let request = self
            .request(Method::DELETE)?
            .header(consts::HEADER_PREFER, consts::PREFER_RETURN_REPRESENTATION);

        let deleted: Vec<serde_json::Value> = decode(send(request).await?).await?;
        if deleted.is_empty() {
            return Err(DataError::not_found(format!(
                "no rows deleted from {table}, the row does not exist or is not visible"
            )));
        }

        Ok(())
    }

    fn request(&self, method: Method) -> DataResult<RequestBuilder> {
        let accept = if self.single {
            consts::ACCEPT_SINGLE_OBJECT
        } else {
            "application/json"
        };

        Ok(self
            .connection
            .request(method, self.table)?
            .header(header::ACCEPT, accept)
            .query(&self.params))
    }
}

async fn send(request: RequestBuilder) -> DataResult<Response> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = DataError::from_response(status.as_u16(), &body);
        log::debug!("backend query failed with {status}: {error}");
        return Err(error);
    }

    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> DataResult<T> {
    let body = response.bytes().await?;

    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_and_order_params() {
        let connection = Connection::new("https://demo.supabase.co", "anon").unwrap();
        let query = TableQuery::new(&connection, Table::Appointments)
            .eq("pet_id", "pet-1")
            .order("appointment_date", true);

        assert_eq!(
            query.params(),
            &[
                ("pet_id".to_string(), "eq.pet-1".to_string()),
                ("order".to_string(), "appointment_date.asc".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_placeholder_connection_never_reaches_the_network() {
        let connection = Connection::placeholder();

        let error = TableQuery::new(&connection, Table::Pets)
            .select::<Vec<serde_json::Value>>()
            .await
            .unwrap_err();

        assert_eq!(error.kind(), crate::ErrorKind::Configuration);
    }
}
