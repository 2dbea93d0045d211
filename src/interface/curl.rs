/// Render one request as an equivalent curl command against an http gateway of the same address.
pub fn to_curl<S: AsRef<str>>(address: &str, method: &str, headers: &[S], data: &str) -> String {
    let mut curl = format!("curl http://{}/api/{}", address, method);
    for header in headers {
        curl.push_str(&format!(" -H '{}'", header.as_ref()));
    }
    curl.push_str(" -X 'POST' -H 'Content-Type: application/json'");
    curl.push_str(&format!(" --data-binary '{}'", data));
    curl.push_str(" --compressed");
    curl
}
