pub mod in_memory_nonce_ledger;
