mod backup_tests;
mod fixture;
mod restore_tests;
