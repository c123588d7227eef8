pub mod hourly_csv;
