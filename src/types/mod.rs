pub mod calendar;
pub mod city;
pub mod metric;
pub mod observation;
