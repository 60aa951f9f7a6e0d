//! 自動寄送郵件的固定內容

pub const ATTENDANCE_SUBJECT: &str = "[Odyssey Management] Today's Attendance";

pub const ATTENDANCE_PLAIN_TEXT: &str = "Hey guys,\n\n\
Please see attached for today's attendance sheet.\n\n\
This is an Automated Email Sent from the Odyssey Management Software.\n";

pub const ATTENDANCE_HTML: &str = r#"<html>
  <body>
    <p>Hey guys,<br>
    <br>
    Please see attached for today's attendance sheet.<br>
    <p>This is an Automated Email Sent from the Odyssey Management Software.</p>
  </body>
</html>
"#;
