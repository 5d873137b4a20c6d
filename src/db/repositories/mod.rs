mod categories;
mod loops;
