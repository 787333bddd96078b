mod end_to_end;
mod ordering;
mod recovery;
mod resolution;
