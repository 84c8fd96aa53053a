mod test_raw;
mod test_reconciler;
