use criterion::{criterion_group, criterion_main, Criterion};

use gmsm::sm9::{self, enc, sig, CurveId};
use gmsm::sms4::{modes::Ctr128, Sms4Key};

const ID: &[u8] = b"Alice";

fn bench_sm9(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let (params, msk) = sm9::setup(CurveId::Sm9Bn256V1, &mut rng).unwrap();

    c.bench_function("sm9 setup", |b| {
        b.iter(|| sm9::setup(CurveId::Sm9Bn256V1, &mut rng).unwrap())
    });

    c.bench_function("sm9 extract signing key", |b| {
        b.iter(|| sig::extract_user_secret_key(&params, &msk, ID).unwrap())
    });

    let sign_key = sig::extract_user_secret_key(&params, &msk, ID).unwrap();
    let digest = [0x5au8; 32];

    c.bench_function("sm9 sign", |b| {
        b.iter(|| sig::sign(&params, &sign_key, &digest, &mut rng).unwrap())
    });

    let signature = sig::sign(&params, &sign_key, &digest, &mut rng).unwrap();
    c.bench_function("sm9 verify", |b| {
        b.iter(|| sig::verify(&params, &digest, &signature, ID).unwrap())
    });

    let enc_key = enc::extract_user_secret_key(&params, &msk, ID).unwrap();
    let msg = [0xa5u8; 1024];

    c.bench_function("sm9 encrypt 1KiB", |b| {
        b.iter(|| enc::encrypt_with_recommended(&params, ID, &msg, &mut rng).unwrap())
    });

    let ct = enc::encrypt_with_recommended(&params, ID, &msg, &mut rng).unwrap();
    c.bench_function("sm9 decrypt 1KiB", |b| {
        b.iter(|| enc::decrypt_with_recommended(&params, &ct, &enc_key, ID).unwrap())
    });
}

fn bench_sms4(c: &mut Criterion) {
    let key = [0x42u8; 16];
    let sms4 = Sms4Key::new_encrypt(&key);
    let block = [0x13u8; 16];

    c.bench_function("sms4 block", |b| b.iter(|| sms4.encrypt_block(&block)));

    c.bench_function("sms4 ctr 1KiB", |b| {
        b.iter(|| {
            let mut data = [0x13u8; 1024];
            Ctr128::new(&key, [0u8; 16]).apply_keystream(&mut data);
            data
        })
    });
}

criterion_group!(benches, bench_sm9, bench_sms4);
criterion_main!(benches);
