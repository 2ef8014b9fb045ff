//! SQL text for the dashboard's two warehouse queries.
//!
//! Only `i64` values and the validated dataset name are spliced in, so the
//! text cannot pick up SQL syntax from request input.

/// Display name of a server.
pub fn server_name_statement(dataset: &str, server_id: i64) -> String {
    format!("select name from {dataset}.users where id = {server_id}")
}

/// Job counts per primary-address hex cell for one server over the lookback window.
///
/// Each job contributes one address: live addresses rank before deleted ones
/// (NULL `deleted_at` sorts first), then `primary` ones first.
pub fn jobs_by_cell_statement(dataset: &str, server_id: i64, lookback_days: i64) -> String {
    format!(
        r#"WITH PrimaryAddresses AS (
SELECT
job_addresses.id,
job_addresses.job_id,
job_addresses.zip,
job_addresses.cell,
ROW_NUMBER() OVER (PARTITION BY job_addresses.job_id ORDER BY job_addresses.deleted_at ASC, job_addresses.primary DESC) as rn
FROM
{dataset}.job_addresses
)

select
FORMAT("%x", PrimaryAddresses.cell) as cell,
count(*) as jobs
from {dataset}.jobs
left join PrimaryAddresses on PrimaryAddresses.job_id = jobs.id and PrimaryAddresses.rn = 1
where server_id = {server_id}
and created_at >= DATE_SUB(CURRENT_TIMESTAMP(), INTERVAL {lookback_days} DAY)
group by PrimaryAddresses.cell
"#
    )
}
