//! Full chain backend — bodies, receipts, and account state.
//!
//! A node operating with full chain data answers retrievals directly from
//! here (the ODR engine's local shortcut). The same backend is what an
//! honest serving peer reads from, so it also builds the proofs that light
//! clients validate.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use wisp_types::{
    execute_call, merkle_root, receipts_root, Account, AccountProof, Address, AuditPath, Body,
    Hash, Header, Receipt, Transaction, TxStatusProof, Weight,
};

use crate::error::ChainError;
use crate::light::HeaderChain;

/// Flat account state at one block, committed to by the header's
/// `state_root`. Accounts are kept address-ordered so leaf indices are
/// deterministic.
#[derive(Clone, Debug, Default)]
pub struct StateSnapshot {
    accounts: BTreeMap<Address, Account>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    pub fn get(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    fn leaves(&self) -> Vec<Hash> {
        self.accounts
            .iter()
            .map(|(addr, acct)| acct.leaf_hash(addr))
            .collect()
    }

    /// Merkle root over all account leaves.
    pub fn root(&self) -> Hash {
        merkle_root(&self.leaves())
    }

    /// Inclusion proof for an account, or `None` if the address is absent.
    pub fn proof(&self, address: &Address) -> Option<AccountProof> {
        let index = self.accounts.keys().position(|a| a == address)?;
        let account = self.accounts.get(address)?.clone();
        let path = AuditPath::build(&self.leaves(), index)?;
        Some(AccountProof { account, path })
    }
}

struct FullInner {
    bodies: HashMap<Hash, Body>,
    receipts: HashMap<Hash, Vec<Receipt>>,
    /// State snapshots keyed by state root (headers reference them by root).
    states: HashMap<Hash, StateSnapshot>,
    /// Transaction hash to (block hash, block number, index in block).
    tx_index: HashMap<Hash, (Hash, u64, u32)>,
}

/// Header chain plus the block data a full node keeps.
pub struct FullBackend {
    chain: HeaderChain,
    inner: RwLock<FullInner>,
}

impl FullBackend {
    /// Create a backend with an empty genesis block over `genesis_state`.
    pub fn new(genesis_state: StateSnapshot, weight_step: Weight) -> Self {
        let state_root = genesis_state.root();
        let genesis = Header {
            number: 0,
            parent_hash: Hash::ZERO,
            state_root,
            receipts_root: Hash::ZERO,
            tx_root: Hash::ZERO,
            weight_step,
        };
        let genesis_hash = genesis.hash();
        let mut states = HashMap::new();
        states.insert(state_root, genesis_state);
        let mut bodies = HashMap::new();
        bodies.insert(genesis_hash, Body::default());
        let mut receipts = HashMap::new();
        receipts.insert(genesis_hash, Vec::new());
        Self {
            chain: HeaderChain::new(genesis),
            inner: RwLock::new(FullInner {
                bodies,
                receipts,
                states,
                tx_index: HashMap::new(),
            }),
        }
    }

    pub fn chain(&self) -> &HeaderChain {
        &self.chain
    }

    pub fn genesis_header(&self) -> Header {
        self.chain
            .get_header_by_number(0)
            .expect("genesis header always present")
    }

    /// Append a block on the current head with the given transactions and
    /// resulting state, generating receipts and sealing a header whose roots
    /// commit to all of it. Returns the new header.
    pub fn extend_chain(
        &self,
        transactions: Vec<Transaction>,
        state: StateSnapshot,
        weight_step: Weight,
    ) -> Result<Header, ChainError> {
        let head = self.chain.head();
        let body = Body { transactions };
        let block_receipts: Vec<Receipt> = body
            .transactions
            .iter()
            .map(|tx| Receipt {
                tx_hash: tx.hash(),
                success: true,
                gas_used: 21_000,
            })
            .collect();
        let header = Header {
            number: head.number + 1,
            parent_hash: head.hash,
            state_root: state.root(),
            receipts_root: receipts_root(&block_receipts),
            tx_root: body.tx_root(),
            weight_step,
        };
        self.chain.insert_header_chain(std::slice::from_ref(&header), 0)?;

        let hash = header.hash();
        let mut inner = self.inner.write().expect("backend lock poisoned");
        for (i, tx) in body.transactions.iter().enumerate() {
            inner
                .tx_index
                .insert(tx.hash(), (hash, header.number, i as u32));
        }
        inner.bodies.insert(hash, body);
        inner.receipts.insert(hash, block_receipts);
        inner.states.insert(header.state_root, state);
        Ok(header)
    }

    pub fn body(&self, hash: &Hash) -> Option<Body> {
        let inner = self.inner.read().expect("backend lock poisoned");
        inner.bodies.get(hash).cloned()
    }

    pub fn receipts(&self, hash: &Hash) -> Option<Vec<Receipt>> {
        let inner = self.inner.read().expect("backend lock poisoned");
        inner.receipts.get(hash).cloned()
    }

    pub fn account(&self, state_root: &Hash, address: &Address) -> Option<Account> {
        let inner = self.inner.read().expect("backend lock poisoned");
        inner.states.get(state_root)?.get(address).cloned()
    }

    /// Inclusion proof for an account under a known state root.
    pub fn account_proof(&self, state_root: &Hash, address: &Address) -> Option<AccountProof> {
        let inner = self.inner.read().expect("backend lock poisoned");
        inner.states.get(state_root)?.proof(address)
    }

    /// Inclusion proof and position for a transaction, if known.
    pub fn tx_status(&self, tx_hash: &Hash) -> Option<TxStatusProof> {
        let inner = self.inner.read().expect("backend lock poisoned");
        let (block_hash, block_number, index) = *inner.tx_index.get(tx_hash)?;
        let body = inner.bodies.get(&block_hash)?;
        let transaction = body.transactions.get(index as usize)?.clone();
        let leaves: Vec<Hash> = body.transactions.iter().map(|tx| tx.hash()).collect();
        let path = AuditPath::build(&leaves, index as usize)?;
        Some(TxStatusProof {
            transaction,
            block_hash,
            block_number,
            index,
            path,
        })
    }

    /// Execute a contract call directly over local state.
    pub fn call(&self, anchor: &Header, address: &Address, input: &[u8]) -> Option<Vec<u8>> {
        let account = self.account(&anchor.state_root, address)?;
        Some(execute_call(&account, input))
    }

    /// The chain segment of up to `count` headers ending at `to`, ascending
    /// by height. Empty when `to` is unknown.
    pub fn headers_ending_at(&self, to: &Hash, count: u64) -> Vec<Header> {
        let mut out = Vec::new();
        let mut cursor = *to;
        for _ in 0..count {
            let Some(header) = self.chain.get_header(&cursor) else {
                break;
            };
            cursor = header.parent_hash;
            let at_genesis = header.number == 0;
            out.push(header);
            if at_genesis {
                break;
            }
        }
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn account(balance: u128) -> Account {
        Account {
            nonce: 0,
            balance,
            code_hash: Hash::digest(b"code"),
        }
    }

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            nonce,
            from: addr(1),
            to: addr(2),
            value: 5,
            input: vec![],
        }
    }

    fn backend_with_block() -> (FullBackend, Header) {
        let mut genesis_state = StateSnapshot::new();
        genesis_state.insert(addr(1), account(100));
        genesis_state.insert(addr(2), account(50));
        let backend = FullBackend::new(genesis_state, Weight::new(1));

        let mut state = StateSnapshot::new();
        state.insert(addr(1), account(95));
        state.insert(addr(2), account(55));
        let header = backend
            .extend_chain(vec![tx(0), tx(1)], state, Weight::new(2))
            .expect("extend");
        (backend, header)
    }

    #[test]
    fn extended_block_is_head() {
        let (backend, header) = backend_with_block();
        assert_eq!(backend.chain().head().hash, header.hash());
        assert_eq!(backend.chain().head().weight, Weight::new(3));
    }

    #[test]
    fn body_matches_header_commitment() {
        let (backend, header) = backend_with_block();
        let body = backend.body(&header.hash()).expect("body");
        assert_eq!(body.tx_root(), header.tx_root);
        let receipts = backend.receipts(&header.hash()).expect("receipts");
        assert_eq!(receipts_root(&receipts), header.receipts_root);
    }

    #[test]
    fn account_proof_resolves_to_state_root() {
        let (backend, header) = backend_with_block();
        let proof = backend
            .account_proof(&header.state_root, &addr(1))
            .expect("proof");
        let leaf = proof.account.leaf_hash(&addr(1));
        assert_eq!(proof.path.resolve(leaf), header.state_root);
    }

    #[test]
    fn missing_account_has_no_proof() {
        let (backend, header) = backend_with_block();
        assert!(backend.account_proof(&header.state_root, &addr(9)).is_none());
    }

    #[test]
    fn tx_status_path_resolves_to_tx_root() {
        let (backend, header) = backend_with_block();
        let wanted = tx(1).hash();
        let status = backend.tx_status(&wanted).expect("status");
        assert_eq!(status.block_hash, header.hash());
        assert_eq!(status.index, 1);
        assert_eq!(
            status.path.resolve(status.transaction.hash()),
            header.tx_root
        );
    }

    #[test]
    fn headers_ending_at_is_ascending() {
        let (backend, header) = backend_with_block();
        let segment = backend.headers_ending_at(&header.hash(), 10);
        assert_eq!(segment.len(), 2);
        assert_eq!(segment[0].number, 0);
        assert_eq!(segment[1].hash(), header.hash());
    }

    #[test]
    fn call_matches_recomputed_output() {
        let (backend, header) = backend_with_block();
        let out = backend.call(&header, &addr(1), b"ping").expect("call");
        let acct = backend.account(&header.state_root, &addr(1)).expect("acct");
        assert_eq!(out, execute_call(&acct, b"ping"));
    }
}
