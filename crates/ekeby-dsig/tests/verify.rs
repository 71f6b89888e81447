use base64::Engine;
use ekeby_core::{algorithm, ns, Error};
use ekeby_crypto::SigningKey;
use ekeby_dsig::{verify, verify_with_key, DsigContext, Reference, ReferenceProcessor, VerifyResult};
use ekeby_keys::PublicKey;
use ekeby_xml::document::find_element;
use ekeby_xml::SignatureInput;

const ENVELOPED: &[&str] = &[algorithm::ENVELOPED_SIGNATURE, algorithm::C14N];

fn b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

struct Template<'t> {
    body: &'t str,
    uri: &'t str,
    transforms: &'t [&'t str],
    key_info: &'t str,
}

impl Template<'_> {
    fn render(&self, digest: &str, value: &str) -> String {
        let transforms: String = self
            .transforms
            .iter()
            .map(|uri| format!(r#"<ds:Transform Algorithm="{uri}"/>"#))
            .collect();
        format!(
            r#"<doc xmlns="urn:example">{body}<ds:Signature xmlns:ds="{dsig}"><ds:SignedInfo><ds:CanonicalizationMethod Algorithm="{c14n}"/><ds:SignatureMethod Algorithm="{method}"/><ds:Reference URI="{uri}"><ds:Transforms>{transforms}</ds:Transforms><ds:DigestMethod Algorithm="{sha}"/><ds:DigestValue>{digest}</ds:DigestValue></ds:Reference></ds:SignedInfo><ds:SignatureValue>{value}</ds:SignatureValue>{key_info}</ds:Signature></doc>"#,
            body = self.body,
            dsig = ns::DSIG,
            c14n = algorithm::C14N,
            method = algorithm::ECDSA_SHA256,
            uri = self.uri,
            sha = algorithm::SHA256,
            key_info = self.key_info,
        )
    }

    /// Produce the reference digest, then sign the canonical SignedInfo.
    fn sign(&self, ctx: &DsigContext, key: &p256::ecdsa::SigningKey) -> String {
        let unsigned = self.render("", "");
        let doc = ekeby_xml::parse(&unsigned).unwrap();
        let element = find_element(doc.root(), ns::DSIG, ns::node::REFERENCE).unwrap();
        let mut reference = Reference::parse(element, &ctx.transforms).unwrap();
        ReferenceProcessor::new(ctx).produce(&doc, &mut reference).unwrap();
        let digest = b64(reference.digest_value.as_deref().unwrap());

        let digested = self.render(&digest, "");
        let doc = ekeby_xml::parse(&digested).unwrap();
        let signed_info = find_element(doc.root(), ns::DSIG, ns::node::SIGNED_INFO).unwrap();
        let input = SignatureInput::from_subtree(&doc, signed_info, false);
        let mut c14n = Vec::new();
        ctx.transforms
            .canonicalizers()
            .get(algorithm::C14N)
            .unwrap()
            .canonicalize_nodes(input.node_set().unwrap(), &mut c14n)
            .unwrap();
        let value = ekeby_crypto::sign::from_uri(algorithm::ECDSA_SHA256)
            .unwrap()
            .sign(&SigningKey::EcP256(key.clone()), &c14n)
            .unwrap();

        self.render(&digest, &b64(&value))
    }
}

fn key_pair() -> (p256::ecdsa::SigningKey, PublicKey) {
    let sk = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
    let vk = PublicKey::EcP256(*sk.verifying_key());
    (sk, vk)
}

const BODY: &str = r#"<data Id="payload">hello</data>"#;

#[test]
fn enveloped_signature_verifies() {
    let ctx = DsigContext::new();
    let (sk, pk) = key_pair();
    let template = Template {
        body: BODY,
        uri: "",
        transforms: ENVELOPED,
        key_info: "",
    };
    let signed = template.sign(&ctx, &sk);
    assert_eq!(verify_with_key(&ctx, &signed, &pk).unwrap(), VerifyResult::Valid);
}

#[test]
fn tampered_content_is_invalid() {
    let ctx = DsigContext::new();
    let (sk, pk) = key_pair();
    let template = Template {
        body: BODY,
        uri: "",
        transforms: ENVELOPED,
        key_info: "",
    };
    let tampered = template.sign(&ctx, &sk).replace("hello", "hullo");
    let result = verify_with_key(&ctx, &tampered, &pk).unwrap();
    assert!(matches!(result, VerifyResult::Invalid { ref reason } if reason.contains("digest")));
}

#[test]
fn wrong_key_is_invalid() {
    let ctx = DsigContext::new();
    let (sk, _) = key_pair();
    let (_, other) = key_pair();
    let template = Template {
        body: BODY,
        uri: "",
        transforms: ENVELOPED,
        key_info: "",
    };
    let signed = template.sign(&ctx, &sk);
    assert!(!verify_with_key(&ctx, &signed, &other).unwrap().is_valid());
}

#[test]
fn fragment_reference_verifies() {
    let ctx = DsigContext::new();
    let (sk, pk) = key_pair();
    let template = Template {
        body: BODY,
        uri: "#payload",
        transforms: &[algorithm::C14N],
        key_info: "",
    };
    let signed = template.sign(&ctx, &sk);
    assert!(verify_with_key(&ctx, &signed, &pk).unwrap().is_valid());
}

#[test]
fn duplicate_identifier_is_a_wrapping_attack() {
    let body = r#"<data Id="payload">hello</data><evil><data Id="payload">bye</data></evil>"#;
    let template = Template {
        body,
        uri: "#payload",
        transforms: &[algorithm::C14N],
        key_info: "",
    };
    let (_, pk) = key_pair();
    let xml = template.render("", "");

    let err = verify_with_key(&DsigContext::new(), &xml, &pk).unwrap_err();
    assert!(matches!(err, Error::SignatureWrapping { ref id } if id == "payload"));
    assert!(err.is_security_violation());

    // Without secure validation the first element wins and the empty
    // digest simply mismatches.
    let mut lax = DsigContext::new();
    lax.secure_validation = false;
    let result = verify_with_key(&lax, &xml, &pk).unwrap();
    assert!(!result.is_valid());
}

#[test]
fn key_from_embedded_certificate() {
    use p256::pkcs8::DecodePrivateKey;

    let kp = rcgen::KeyPair::generate().unwrap();
    let params = rcgen::CertificateParams::new(vec!["signer.example".into()]).unwrap();
    let cert = params.self_signed(&kp).unwrap();
    let sk = p256::ecdsa::SigningKey::from_pkcs8_der(&kp.serialize_der()).unwrap();

    let key_info = format!(
        "<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>",
        b64(cert.der())
    );
    let template = Template {
        body: BODY,
        uri: "",
        transforms: ENVELOPED,
        key_info: &key_info,
    };
    let ctx = DsigContext::new();
    let signed = template.sign(&ctx, &sk);
    assert!(verify(&ctx, &signed).unwrap().is_valid());
}

#[test]
fn missing_key_info_without_key_is_an_error() {
    let ctx = DsigContext::new();
    let (sk, _) = key_pair();
    let template = Template {
        body: BODY,
        uri: "",
        transforms: ENVELOPED,
        key_info: "",
    };
    let signed = template.sign(&ctx, &sk);
    let err = verify(&ctx, &signed).unwrap_err();
    assert!(matches!(err, Error::Key(_)));
}

#[test]
fn unknown_transform_is_reported() {
    let template = Template {
        body: BODY,
        uri: "",
        transforms: &["urn:example:unknown"],
        key_info: "",
    };
    let (_, pk) = key_pair();
    let err = verify_with_key(&DsigContext::new(), &template.render("", ""), &pk).unwrap_err();
    assert_eq!(err.message_key(), "signature.Transform.UnknownTransform");
}
