//! Envelope signing and signature checks.
//!
//! Every signer signs the same 32 bytes: [`Transaction::hash`] under the
//! configured network id. Adding a signature never touches the transaction
//! itself, which is what makes whitelist co-signing safe.
//!
//! [`Transaction::hash`]: super::builder::Transaction::hash

use super::envelope::{DecoratedSignature, TransactionEnvelope};
use crate::crypto::{Address, Keypair};

/// Appends `keypair`'s signature to the envelope.
///
/// Signing twice with the same key is a no-op, so callers do not have to
/// track who already signed.
pub fn sign_envelope<'a>(
    envelope: &'a mut TransactionEnvelope,
    keypair: &Keypair,
    network_id: &[u8; 32],
) -> &'a TransactionEnvelope {
    if has_signature_from(envelope, &keypair.address(), network_id) {
        return envelope;
    }
    let hash = envelope.tx.hash(network_id);
    envelope.signatures.push(DecoratedSignature {
        hint: keypair.hint(),
        signature: keypair.sign(&hash),
    });
    envelope
}

/// Whether `address` contributed a valid signature for `network_id`.
pub fn has_signature_from(
    envelope: &TransactionEnvelope,
    address: &Address,
    network_id: &[u8; 32],
) -> bool {
    let public_key = address.public_key();
    let hint = public_key.hint();
    let hash = envelope.tx.hash(network_id);
    envelope
        .signatures
        .iter()
        .filter(|s| s.hint == hint)
        .any(|s| public_key.verify(&hash, &s.signature))
}

/// Required signers that have not signed yet, in
/// [`required_signers`](super::builder::Transaction::required_signers) order.
pub fn missing_signers(envelope: &TransactionEnvelope, network_id: &[u8; 32]) -> Vec<Address> {
    envelope
        .tx
        .required_signers()
        .into_iter()
        .filter(|a| !has_signature_from(envelope, a, network_id))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::transaction::{Operation, TransactionBuilder};

    fn channel_envelope(channel: &Keypair, app: &Keypair) -> TransactionEnvelope {
        let tx = TransactionBuilder::new(channel.address())
            .fee(100)
            .sequence(1)
            .operation(
                Operation::payment(Keypair::random().address(), 10).with_source(app.address()),
            )
            .build()
            .unwrap();
        TransactionEnvelope::new(tx)
    }

    #[test]
    fn channel_transactions_need_both_signatures() {
        let network = Environment::testnet().network_id();
        let channel = Keypair::random();
        let app = Keypair::random();
        let mut env = channel_envelope(&channel, &app);

        assert_eq!(
            missing_signers(&env, &network),
            vec![channel.address(), app.address()]
        );

        sign_envelope(&mut env, &channel, &network);
        assert_eq!(missing_signers(&env, &network), vec![app.address()]);

        sign_envelope(&mut env, &app, &network);
        assert!(missing_signers(&env, &network).is_empty());
    }

    #[test]
    fn signing_twice_is_a_noop() {
        let network = Environment::testnet().network_id();
        let channel = Keypair::random();
        let app = Keypair::random();
        let mut env = channel_envelope(&channel, &app);

        sign_envelope(&mut env, &channel, &network);
        sign_envelope(&mut env, &channel, &network);
        assert_eq!(env.signatures.len(), 1);
    }

    #[test]
    fn signature_for_other_network_does_not_count() {
        let channel = Keypair::random();
        let app = Keypair::random();
        let mut env = channel_envelope(&channel, &app);

        sign_envelope(&mut env, &channel, &Environment::production().network_id());
        assert!(!has_signature_from(
            &env,
            &channel.address(),
            &Environment::testnet().network_id()
        ));
    }

    #[test]
    fn signing_does_not_change_the_transaction() {
        let network = Environment::testnet().network_id();
        let channel = Keypair::random();
        let app = Keypair::random();
        let mut env = channel_envelope(&channel, &app);
        let hash_before = env.tx.hash(&network);

        sign_envelope(&mut env, &channel, &network);
        assert_eq!(env.tx.hash(&network), hash_before);
    }
}
